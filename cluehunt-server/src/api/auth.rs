//! Admin token check
//!
//! Admin routes require the `x-admin-token` header to match the configured
//! token. When no token is required (unset, empty or `"dev"`), every request
//! passes.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use crate::{ApiError, AppState};

/// Header carrying the admin token
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Authentication middleware for admin routes
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());

    if provided != Some(expected) {
        warn!(path = %request.uri().path(), "Admin request rejected: bad or missing token");
        return Err(ApiError::Unauthorized);
    }

    Ok(next.run(request).await)
}
