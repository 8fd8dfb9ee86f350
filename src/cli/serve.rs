use anyhow::Result;

use crate::api;
use crate::application::commands::AppState;
use crate::infrastructure::config::AppConfig;

pub async fn run(config: AppConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.host.clone());
    let port = port.unwrap_or(config.port);
    let access_token = std::env::var("AKITIME_ACCESS_TOKEN").ok();

    if config.oauth.is_none() && access_token.is_none() {
        tracing::warn!("no google oauth client configured; /auth routes will answer 401");
    }

    let state = AppState::from_config(config, access_token);
    api::serve(&host, port, state).await?;
    Ok(())
}
