use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::routes;
use crate::application::commands::AppState;
use crate::infrastructure::error::InfraError;

pub type SharedState = Arc<AppState>;

pub fn app(shared_state: SharedState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        // JSON API
        .nest("/api", routes::router())
        // Google sign-in
        .nest("/auth", routes::auth::router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

// Run the server
pub async fn serve(host: &str, port: u16, state: AppState) -> Result<(), InfraError> {
    let app = app(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    tracing::info!("Server started. Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
