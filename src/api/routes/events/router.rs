//! Router for fetched calendar events

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::api::SharedState;
use crate::api::public::ApiError;
use crate::application::commands::{events_snapshot_impl, refresh_events_impl};
use crate::application::event_source::FetchState;

async fn events_snapshot(State(state): State<SharedState>) -> Result<Json<FetchState>, ApiError> {
    Ok(Json(events_snapshot_impl(&state)?))
}

async fn refresh_events(State(state): State<SharedState>) -> Result<Json<FetchState>, ApiError> {
    Ok(Json(refresh_events_impl(&state).await?))
}

/// Create the events router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/events", get(events_snapshot))
        .route("/events/refresh", post(refresh_events))
}
