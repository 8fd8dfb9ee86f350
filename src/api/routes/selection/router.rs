//! Router for the virtual selection API

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};

use super::public::{
    CopySelectionResponse, RemoveSpanResponse, SelectionSnapshot, SpanMutationResponse, SpanRequest,
};
use crate::api::SharedState;
use crate::api::public::ApiError;
use crate::application::commands::{
    add_span_impl, copy_selection_impl, move_span_impl, remove_span_impl, reset_selection_impl,
    selection_snapshot_impl,
};

async fn list_selection(State(state): State<SharedState>) -> Result<Json<SelectionSnapshot>, ApiError> {
    Ok(Json(selection_snapshot_impl(&state)?))
}

async fn add_span(
    State(state): State<SharedState>,
    Json(span): Json<SpanRequest>,
) -> Result<Json<SpanMutationResponse>, ApiError> {
    Ok(Json(add_span_impl(&state, span.start, span.end)?))
}

async fn reset_selection(State(state): State<SharedState>) -> Result<Json<SelectionSnapshot>, ApiError> {
    Ok(Json(reset_selection_impl(&state)?))
}

async fn move_span(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(span): Json<SpanRequest>,
) -> Result<Json<SpanMutationResponse>, ApiError> {
    Ok(Json(move_span_impl(&state, &id, span.start, span.end)?))
}

async fn remove_span(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<RemoveSpanResponse>, ApiError> {
    Ok(Json(remove_span_impl(&state, &id)?))
}

async fn copy_selection(State(state): State<SharedState>) -> Result<Json<CopySelectionResponse>, ApiError> {
    Ok(Json(copy_selection_impl(&state)?))
}

/// Create the selection router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route(
            "/selection",
            get(list_selection).post(add_span).delete(reset_selection),
        )
        .route("/selection/copy", post(copy_selection))
        .route("/selection/{id}", put(move_span).delete(remove_span))
}
