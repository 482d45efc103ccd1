use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db::StoredDocument;

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitDocumentResponse {
    pub document_id: String,
}

/// Body of `save-document`. Fields are optional so a missing one yields a
/// 400 with a readable message instead of an extractor rejection.
#[derive(Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SaveDocumentRequest {
    pub document_id: Option<String>,
    pub content: Option<String>,
    pub language: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct SaveDocumentResponse {
    pub message: String,
    pub document: StoredDocument,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub document: StoredDocument,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DocumentListResponse {
    pub documents: Vec<StoredDocument>,
}

#[derive(Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct RequestPermissionRequest {
    pub document_id: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct GrantPermissionRequest {
    pub document_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Default)]
pub struct RunCodeRequest {
    pub code: Option<String>,
    pub language: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RunCodeResponse {
    pub output: String,
    pub executed_by: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub user: UserResponse,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
}
