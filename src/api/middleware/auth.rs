use crate::AppState;
use crate::api::error::AppError;
use crate::utils::auth::{authenticate, bearer_token};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Resolve the bearer token to a `Principal` and attach it to the request.
/// Runs ahead of the body limit so unauthenticated uploads are refused unread.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| AppError::AuthFailure("missing bearer token".to_string()))?;

    let principal = authenticate(token, &state.config.jwt_secret)
        .map_err(|e| AppError::AuthFailure(format!("invalid bearer token: {:#}", e)))?;
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}
