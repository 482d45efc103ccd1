use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Persisted document as seen by the HTTP routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub document_id: String,
    pub owner_id: String,
    pub content: String,
    pub language: String,
    /// Users besides the owner allowed to load and save the document
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredDocument {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    pub fn is_permitted(&self, user_id: &str) -> bool {
        self.permissions.iter().any(|p| p == user_id)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {0} not found")]
    NotFound(String),
    #[error("document {0} already exists")]
    AlreadyExists(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable storage consulted only at explicit load/save boundaries. The
/// live-session hub never touches it.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn create_document(
        &self,
        document_id: &str,
        owner_id: &str,
        language: &str,
    ) -> Result<StoredDocument, StoreError>;

    async fn find_document(&self, document_id: &str) -> Result<Option<StoredDocument>, StoreError>;

    async fn save_document(
        &self,
        document_id: &str,
        content: &str,
        language: &str,
    ) -> Result<StoredDocument, StoreError>;

    /// Add a user to the permitted list. Adding twice is a no-op.
    async fn add_permission(&self, document_id: &str, user_id: &str) -> Result<(), StoreError>;

    /// Remember that a user saved a document. Marking twice is a no-op.
    async fn mark_saved(&self, user_id: &str, document_id: &str) -> Result<(), StoreError>;

    /// Documents a user has saved, oldest first.
    async fn saved_documents(&self, user_id: &str) -> Result<Vec<StoredDocument>, StoreError>;

    /// Check the backing storage can serve requests.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
