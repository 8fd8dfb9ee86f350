use anyhow::Result;
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::infrastructure::config::{ensure_default_config, load_app_config};

pub mod auth;
pub mod events;
pub mod format;
pub mod serve;

#[derive(Subcommand)]
enum Command {
    /// Run the local HTTP server
    Serve {
        /// Set the server host address
        #[arg(long)]
        host: Option<String>,

        /// Set the server port
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the Google consent URL
    AuthUrl {},
    /// Exchange an authorization code and store the session
    Auth {
        #[arg(long)]
        code: String,
    },
    /// Fetch upstream events for the lookback window
    Events {
        /// Use this access token instead of the stored session
        #[arg(long)]
        token: Option<String>,
    },
    /// Print the copy text for the given spans
    Format {
        /// RFC3339 bounds as START/END, repeatable
        #[arg(long = "span", required = true)]
        spans: Vec<String>,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding app.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,tower_http=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();
    init_tracing();

    let config_dir = args
        .config_dir
        .or_else(|| env::var("AKITIME_CONFIG_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("./config"));

    // Handle each sub command
    match args.command {
        Command::Serve { host, port } => {
            ensure_default_config(&config_dir)?;
            let config = load_app_config(Some(&config_dir))?;
            serve::run(config, host, port).await?;
        }
        Command::AuthUrl {} => {
            let config = load_app_config(Some(&config_dir))?;
            auth::print_authorization_url(config)?;
        }
        Command::Auth { code } => {
            let config = load_app_config(Some(&config_dir))?;
            auth::run(config, &code).await?;
        }
        Command::Events { token } => {
            let config = load_app_config(Some(&config_dir))?;
            events::run(config, token).await?;
        }
        Command::Format { spans } => {
            let config = load_app_config(Some(&config_dir))?;
            format::run(&config, &spans)?;
        }
    }

    Ok(())
}
