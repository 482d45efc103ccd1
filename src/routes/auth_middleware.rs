use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};

use crate::models::{ApiError, ErrorResponse};
use crate::services::auth_service::{authenticate, AuthError};
use crate::AppState;

/// Verify the caller's token and put the resulting `AuthUser` into the
/// request extensions for downstream handlers.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = match authenticate(req.headers(), None, &state.config) {
        Ok(user) => user,
        Err(e @ AuthError::SecretNotConfigured) => {
            error!("Cannot authenticate request: {}", e);
            return Err(ErrorResponse::build(e.status(), e.to_string()));
        }
        Err(e) => {
            debug!("Rejecting unauthenticated request to {}: {}", req.uri().path(), e);
            return Err(ErrorResponse::build(e.status(), e.to_string()));
        }
    };

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
