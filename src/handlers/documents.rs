use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use rand::{distributions::Alphanumeric, Rng};
use tracing::{error, info, warn};

use crate::auth::access;
use crate::db::{StoreError, StoredDocument};
use crate::models::{
    ApiError, DocumentListResponse, DocumentResponse, ErrorResponse, InitDocumentResponse,
    SaveDocumentRequest, SaveDocumentResponse,
};
use crate::services::auth_service::AuthUser;
use crate::AppState;

const DOCUMENT_ID_PREFIX: &str = "doc-";
const DOCUMENT_ID_SUFFIX_LEN: usize = 13;
const MAX_ID_ATTEMPTS: usize = 3;

/// `doc-` followed by random lowercase alphanumerics.
pub fn generate_document_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(DOCUMENT_ID_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}{}", DOCUMENT_ID_PREFIX, suffix)
}

/// Map a store failure onto the HTTP error body.
pub(crate) fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound(id) => ErrorResponse::not_found(format!("Document '{}' not found", id)),
        other => {
            error!("Document store failure: {}", other);
            ErrorResponse::internal(other.to_string())
        }
    }
}

/// Load a document or fail with 404.
pub(crate) async fn find_or_404(state: &AppState, document_id: &str) -> Result<StoredDocument, ApiError> {
    state
        .store
        .find_document(document_id)
        .await
        .map_err(store_error)?
        .ok_or_else(|| ErrorResponse::not_found(format!("Document '{}' not found", document_id)))
}

/// Create an empty document owned by the caller.
pub async fn init_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<(StatusCode, Json<InitDocumentResponse>), ApiError> {
    for _ in 0..MAX_ID_ATTEMPTS {
        let document_id = generate_document_id();
        match state
            .store
            .create_document(&document_id, &user.id, &state.config.default_language)
            .await
        {
            Ok(document) => {
                info!("Document {} initialized by {}", document.document_id, user.id);
                return Ok((
                    StatusCode::OK,
                    Json(InitDocumentResponse {
                        document_id: document.document_id,
                    }),
                ));
            }
            Err(StoreError::AlreadyExists(id)) => warn!("Generated document id {} collided, retrying", id),
            Err(e) => return Err(store_error(e)),
        }
    }
    Err(ErrorResponse::internal("Could not allocate a document id"))
}

/// Persist content and language of a document the caller may edit.
pub async fn save_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<SaveDocumentRequest>,
) -> Result<(StatusCode, Json<SaveDocumentResponse>), ApiError> {
    let (Some(document_id), Some(content), Some(language)) = (
        body.document_id.filter(|id| !id.is_empty()),
        body.content,
        body.language.filter(|l| !l.is_empty()),
    ) else {
        return Err(ErrorResponse::bad_request("All fields are required"));
    };

    let document = find_or_404(&state, &document_id).await?;
    access::ensure_document_access(&document, &user, "save")?;

    let document = state
        .store
        .save_document(&document_id, &content, &language)
        .await
        .map_err(store_error)?;
    state
        .store
        .mark_saved(&user.id, &document_id)
        .await
        .map_err(store_error)?;

    Ok((
        StatusCode::OK,
        Json(SaveDocumentResponse {
            message: "Document saved successfully".to_string(),
            document,
        }),
    ))
}

/// Documents the caller has saved.
pub async fn load_documents(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<(StatusCode, Json<DocumentListResponse>), ApiError> {
    let documents = state
        .store
        .saved_documents(&user.id)
        .await
        .map_err(store_error)?;
    Ok((StatusCode::OK, Json(DocumentListResponse { documents })))
}

pub async fn load_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(document_id): Path<String>,
) -> Result<(StatusCode, Json<DocumentResponse>), ApiError> {
    let document = find_or_404(&state, &document_id).await?;
    access::ensure_document_access(&document, &user, "load")?;
    Ok((StatusCode::OK, Json(DocumentResponse { document })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_have_the_expected_shape() {
        let id = generate_document_id();
        let suffix = id.strip_prefix("doc-").unwrap();
        assert_eq!(suffix.len(), 13);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert_ne!(generate_document_id(), id);
    }
}
