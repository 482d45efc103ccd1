use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::store::{DocumentStore, StoreError, StoredDocument};

#[derive(Debug, Default)]
struct Inner {
    documents: HashMap<String, StoredDocument>,
    saved: HashMap<String, Vec<String>>,
}

/// Process-local store used when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    inner: RwLock<Inner>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create_document(
        &self,
        document_id: &str,
        owner_id: &str,
        language: &str,
    ) -> Result<StoredDocument, StoreError> {
        let mut inner = self.inner.write().await;
        if inner.documents.contains_key(document_id) {
            return Err(StoreError::AlreadyExists(document_id.to_string()));
        }
        let now = Utc::now();
        let document = StoredDocument {
            document_id: document_id.to_string(),
            owner_id: owner_id.to_string(),
            content: String::new(),
            language: language.to_string(),
            permissions: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        inner
            .documents
            .insert(document_id.to_string(), document.clone());
        Ok(document)
    }

    async fn find_document(&self, document_id: &str) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self.inner.read().await.documents.get(document_id).cloned())
    }

    async fn save_document(
        &self,
        document_id: &str,
        content: &str,
        language: &str,
    ) -> Result<StoredDocument, StoreError> {
        let mut inner = self.inner.write().await;
        let document = inner
            .documents
            .get_mut(document_id)
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))?;
        document.content = content.to_string();
        document.language = language.to_string();
        document.updated_at = Utc::now();
        Ok(document.clone())
    }

    async fn add_permission(&self, document_id: &str, user_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let document = inner
            .documents
            .get_mut(document_id)
            .ok_or_else(|| StoreError::NotFound(document_id.to_string()))?;
        if !document.is_permitted(user_id) {
            document.permissions.push(user_id.to_string());
        }
        Ok(())
    }

    async fn mark_saved(&self, user_id: &str, document_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.documents.contains_key(document_id) {
            return Err(StoreError::NotFound(document_id.to_string()));
        }
        let saved = inner.saved.entry(user_id.to_string()).or_default();
        if !saved.iter().any(|id| id == document_id) {
            saved.push(document_id.to_string());
        }
        Ok(())
    }

    async fn saved_documents(&self, user_id: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let inner = self.inner.read().await;
        let documents = inner
            .saved
            .get(user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.documents.get(id).cloned())
            .collect();
        Ok(documents)
    }
}
