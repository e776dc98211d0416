use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
    typed_header::TypedHeaderRejection,
};
use tracing::debug;

use crate::auth::AppState;
use crate::error::AppError;

pub use entraide_types::api::Claims;

/// Extract and validate the bearer token from the Authorization header.
/// On success the token's `Claims` are available to handlers as
/// `Extension<Claims>`.
pub async fn require_auth(
    State(state): State<AppState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let TypedHeader(authorization) = bearer.map_err(|e| {
        debug!("Missing or malformed Authorization header: {}", e);
        AppError::Unauthenticated("Non autorisé")
    })?;

    let claims = state
        .tokens
        .verify(authorization.token())
        .ok_or(AppError::Unauthenticated("Token invalide"))?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
