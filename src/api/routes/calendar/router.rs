//! Router for the upcoming-events relay

use axum::{
    Json, Router,
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
};
use http::{HeaderMap, StatusCode, header};

use crate::api::SharedState;
use crate::api::public::ApiError;
use crate::application::commands::relay_upcoming_impl;

async fn calendar_relay(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let relayed = relay_upcoming_impl(&state, authorization).await?;
    let status = StatusCode::from_u16(relayed.status).unwrap_or(StatusCode::BAD_GATEWAY);
    Ok((status, Json(relayed.body)).into_response())
}

/// Create the calendar relay router
pub fn router() -> Router<SharedState> {
    Router::new().route("/calendar", get(calendar_relay))
}
