use axum::{extract::State, http::{HeaderMap, StatusCode}, Extension, Json};

use crate::models::{ApiError, AuthStatusResponse, MeResponse, UserResponse};
use crate::services::auth_service::{authenticate, AuthUser};
use crate::AppState;

/// Identity of the verified caller.
pub async fn me(
    Extension(user): Extension<AuthUser>,
) -> Result<(StatusCode, Json<MeResponse>), ApiError> {
    Ok((
        StatusCode::OK,
        Json(MeResponse {
            user: UserResponse {
                id: user.id,
                username: user.username,
            },
        }),
    ))
}

/// Public probe telling a client whether its token is still accepted.
pub async fn auth_status(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<AuthStatusResponse> {
    let authenticated = authenticate(&headers, None, &state.config).is_ok();
    Json(AuthStatusResponse { authenticated })
}
