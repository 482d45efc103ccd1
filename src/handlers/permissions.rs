use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::info;

use crate::auth::access;
use crate::handlers::documents::{find_or_404, store_error};
use crate::models::{ApiError, ErrorResponse, GrantPermissionRequest, MessageResponse, RequestPermissionRequest};
use crate::services::auth_service::AuthUser;
use crate::AppState;

/// Ask the owner of a document for access. The owner is notified on
/// every live connection of theirs.
pub async fn request_permission(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<RequestPermissionRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Some(document_id) = body.document_id.filter(|id| !id.is_empty()) else {
        return Err(ErrorResponse::bad_request("Document ID is required"));
    };

    let document = find_or_404(&state, &document_id).await?;
    state
        .hub
        .request_permission(&document_id, &document.owner_id, &user.id, &user.username)
        .await;

    Ok((
        StatusCode::OK,
        Json(MessageResponse::new("Permission request sent successfully")),
    ))
}

/// Owner-only: add a user to the permitted list and notify them.
pub async fn grant_permission(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<GrantPermissionRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let (Some(document_id), Some(user_id)) = (
        body.document_id.filter(|id| !id.is_empty()),
        body.user_id.filter(|id| !id.is_empty()),
    ) else {
        return Err(ErrorResponse::bad_request("Document ID and User ID are required"));
    };

    let document = find_or_404(&state, &document_id).await?;
    access::ensure_owner(&document, &user)?;

    state
        .store
        .add_permission(&document_id, &user_id)
        .await
        .map_err(store_error)?;
    info!("User {} granted {} access to {}", user.id, user_id, document_id);
    state.hub.grant_permission(&document_id, &user_id).await;

    Ok((
        StatusCode::OK,
        Json(MessageResponse::new("Permission granted successfully")),
    ))
}
