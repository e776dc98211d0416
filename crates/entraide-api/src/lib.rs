pub mod auth;
pub mod donations;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod needs;

use axum::{
    Json, Router, middleware as axum_middleware,
    routing::{get, patch, post},
};
use serde_json::json;
use tracing::error;

use crate::auth::AppState;
use crate::error::AppError;

/// Build the HTTP API. Public routes need no token; every other route goes
/// through [`middleware::require_auth`].
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/auth/signup", post(auth::signup))
        .route("/auth/signin", post(auth::signin))
        .route("/needs", get(needs::list_needs))
        .route("/donations", get(donations::list_donations))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/needs", post(needs::create_need))
        .route("/needs/my-needs", get(needs::my_needs))
        .route("/needs/stats", get(needs::need_stats))
        .route("/needs/{need_id}/status", patch(needs::update_status))
        .route("/donations", post(donations::create_donation))
        .route("/messages", get(messages::get_thread))
        .route("/messages", post(messages::send_message))
        .route("/messages/conversations", get(messages::get_conversations))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Run blocking store work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        AppError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
    })?
}
