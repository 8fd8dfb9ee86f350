//! Public types for the sign-in routes
use serde::Deserialize;

pub use crate::application::commands::LoginCompletedResponse;

/// Query string Google appends to the redirect URI.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}
