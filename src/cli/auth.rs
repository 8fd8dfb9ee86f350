use anyhow::{Result, anyhow};
use std::sync::Arc;

use crate::application::session::SessionManager;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::credential_store::KeyringCredentialStore;
use crate::infrastructure::oauth_client::ReqwestOAuthClient;

type KeyringSession = SessionManager<KeyringCredentialStore, ReqwestOAuthClient>;

fn session(config: AppConfig) -> Result<KeyringSession> {
    let oauth = config.oauth.ok_or_else(|| {
        anyhow!("set AKITIME_GOOGLE_CLIENT_ID and AKITIME_GOOGLE_CLIENT_SECRET first")
    })?;
    Ok(SessionManager::new(
        oauth,
        Arc::new(KeyringCredentialStore::default()),
        Arc::new(ReqwestOAuthClient::new()),
    ))
}

pub fn print_authorization_url(config: AppConfig) -> Result<()> {
    let state = format!("cli-{}", chrono::Utc::now().timestamp_millis());
    let url = session(config)?.build_authorization_url(&state)?;
    println!("{url}");
    Ok(())
}

pub async fn run(config: AppConfig, code: &str) -> Result<()> {
    let token = session(config)?.authenticate_with_code(code.trim()).await?;
    println!("Signed in. Access token expires at {}", token.expires_at.to_rfc3339());
    Ok(())
}
