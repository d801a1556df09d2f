//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::debug;

use crate::error::ApiError;
use crate::web::state::AppState;

/// Middleware that reads the identity header set by the upstream auth proxy.
///
/// If valid, inserts the `UserIdentity` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    // 1. Extract the identity header
    let credential = req
        .headers()
        .get(state.config.auth_header.as_str())
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::Unauthorized)?;

    // 2. Resolve it through the identity port
    let identity = state.identity.verify(credential).await.map_err(|e| {
        debug!("Rejected identity header: {}", e);
        ApiError::Unauthorized
    })?;

    // 3. Insert the identity into request extensions
    req.extensions_mut().insert(identity);

    // 4. Continue to the handler
    Ok(next.run(req).await)
}
