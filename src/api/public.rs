//! Public API types

use axum::Json;
use axum::response::{IntoResponse, Response};
use http::StatusCode;

use crate::infrastructure::error::InfraError;

// Errors

#[derive(Debug)]
pub struct ApiError(InfraError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            InfraError::MissingCredential | InfraError::Unauthorized(_) | InfraError::OAuth(_) => {
                StatusCode::UNAUTHORIZED
            }
            InfraError::FetchInProgress => StatusCode::CONFLICT,
            InfraError::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            InfraError::Upstream { .. } | InfraError::Network(_) | InfraError::InvalidEvent(_) => {
                StatusCode::BAD_GATEWAY
            }
            InfraError::Io(_) | InfraError::Json(_) | InfraError::Credential(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Convert `ApiError` into a JSON `{"error": ...}` response.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(status = status.as_u16(), "{}", self.0);

        let message = match self.0 {
            InfraError::Unauthorized(message) => message,
            other => other.to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<InfraError> for ApiError {
    fn from(err: InfraError) -> Self {
        Self(err)
    }
}

// Re-export public types from each route

pub mod auth {
    pub use crate::api::routes::auth::public::*;
}

pub mod selection {
    pub use crate::api::routes::selection::public::*;
}
