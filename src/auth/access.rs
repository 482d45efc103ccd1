use crate::db::StoredDocument;
use crate::models::{ApiError, ErrorResponse};
use crate::services::auth_service::AuthUser;

const ADMIN_ROLE: &str = "admin";

/// Owner or member of the permitted list. There is no finer-grained policy.
pub fn can_access(document: &StoredDocument, user_id: &str) -> bool {
    document.is_owned_by(user_id) || document.is_permitted(user_id)
}

pub fn ensure_document_access(document: &StoredDocument, user: &AuthUser, action: &str) -> Result<(), ApiError> {
    if can_access(document, &user.id) {
        return Ok(());
    }
    Err(ErrorResponse::forbidden(format!(
        "You do not have permission to {} this document",
        action
    )))
}

pub fn ensure_owner(document: &StoredDocument, user: &AuthUser) -> Result<(), ApiError> {
    if document.is_owned_by(&user.id) {
        return Ok(());
    }
    Err(ErrorResponse::forbidden("Only the owner can grant permission"))
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), ApiError> {
    if user.has_role(ADMIN_ROLE) {
        return Ok(());
    }
    Err(ErrorResponse::forbidden("Admin access required"))
}
