//! Router for Google sign-in

use axum::{
    Json, Router,
    extract::{Query, State},
    response::Redirect,
    routing::{get, post},
};
use http::StatusCode;

use super::public::{CallbackQuery, LoginCompletedResponse};
use crate::api::SharedState;
use crate::api::public::ApiError;
use crate::application::commands::{begin_login_impl, complete_login_impl, sign_out_impl};
use crate::infrastructure::error::InfraError;

async fn login(State(state): State<SharedState>) -> Result<Redirect, ApiError> {
    let url = begin_login_impl(&state)?;
    Ok(Redirect::to(&url))
}

async fn callback(
    State(state): State<SharedState>,
    Query(params): Query<CallbackQuery>,
) -> Result<Json<LoginCompletedResponse>, ApiError> {
    if let Some(error) = params.error {
        return Err(InfraError::OAuth(format!("consent was not granted: {error}")).into());
    }
    let code = params
        .code
        .ok_or_else(|| InfraError::InvalidConfig("code is required".to_string()))?;
    let oauth_state = params
        .state
        .ok_or_else(|| InfraError::InvalidConfig("state is required".to_string()))?;

    Ok(Json(complete_login_impl(&state, &code, &oauth_state).await?))
}

async fn logout(State(state): State<SharedState>) -> Result<StatusCode, ApiError> {
    sign_out_impl(&state)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create the sign-in router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/logout", post(logout))
}
