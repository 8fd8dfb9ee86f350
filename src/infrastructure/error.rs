use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("OAuth error: {0}")]
    OAuth(String),
    #[error("Credential store error: {0}")]
    Credential(String),
    #[error("Googleアクセストークンがありません")]
    MissingCredential,
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("google calendar api error: http {status}")]
    Upstream { status: u16, body: String },
    #[error("invalid calendar event: {0}")]
    InvalidEvent(String),
    #[error("an event fetch is already in progress")]
    FetchInProgress,
}
