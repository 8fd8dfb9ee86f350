use anyhow::{Result, bail};

use crate::application::commands::{AppState, refresh_events_impl};
use crate::application::event_source::FetchState;
use crate::infrastructure::config::AppConfig;

pub async fn run(config: AppConfig, token: Option<String>) -> Result<()> {
    let state = AppState::from_config(config, token);
    match refresh_events_impl(&state).await? {
        FetchState::Loaded { events, .. } => {
            println!("{}", serde_json::to_string_pretty(&events)?);
            Ok(())
        }
        FetchState::Failed { message } => bail!(message),
        other => bail!("unexpected fetch state: {other:?}"),
    }
}
