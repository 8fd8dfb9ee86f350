//! API routes module

pub mod auth;
mod calendar;
mod events;
pub mod selection;

use axum::Router;

use crate::api::SharedState;

/// Create the combined API router
pub fn router() -> Router<SharedState> {
    Router::new()
        // Virtual selection
        .merge(selection::router())
        // Fetched upstream events
        .merge(events::router())
        // Relay for upcoming events with the caller's bearer
        .merge(calendar::router())
}
