//! Test utilities for integration tests
use std::sync::Arc;

use axum::{Router, body::Body};

use akitime_maker::api::app;
use akitime_maker::application::commands::AppState;
use akitime_maker::application::session::StaticCredentialProvider;
use akitime_maker::infrastructure::config::{AppConfig, ConfigFile, build_config};
use akitime_maker::infrastructure::google_calendar_client::ReqwestGoogleCalendarClient;

/// Config with defaults only, ignoring the process environment.
pub fn test_config(calendar_api_base: &str) -> AppConfig {
    let mut config = build_config(ConfigFile::default(), |_| None).expect("default config");
    config.calendar_api_base = calendar_api_base.to_string();
    config
}

/// Creates a router whose upstream calendar API lives at
/// `calendar_api_base` and whose stored credential is `access_token`.
pub fn test_app(calendar_api_base: &str, access_token: Option<&str>) -> Router {
    let config = test_config(calendar_api_base);
    let state = AppState::new(
        config,
        Arc::new(StaticCredentialProvider::new(access_token.map(str::to_string))),
        None,
        Arc::new(ReqwestGoogleCalendarClient::with_api_base(calendar_api_base)),
    );
    app(Arc::new(state))
}

pub async fn body_to_json(body: Body) -> serde_json::Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
