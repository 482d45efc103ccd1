use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Error as SqlxError;
use std::time::Duration;
use tracing::{error, info};

use super::store::{DocumentStore, StoreError, StoredDocument};

const CREATE_DOCUMENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        document_id TEXT PRIMARY KEY,
        owner_id    TEXT NOT NULL,
        content     TEXT NOT NULL DEFAULT '',
        language    TEXT NOT NULL DEFAULT 'javascript',
        permissions TEXT[] NOT NULL DEFAULT '{}',
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
"#;

const CREATE_SAVED_DOCUMENTS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS saved_documents (
        user_id     TEXT NOT NULL,
        document_id TEXT NOT NULL REFERENCES documents (document_id),
        saved_at    TIMESTAMPTZ NOT NULL DEFAULT now(),
        PRIMARY KEY (user_id, document_id)
    )
"#;

/// Postgres SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Postgres-backed document store
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    /// Create a new database connection pool
    ///
    /// # Arguments
    /// * `database_url` - PostgreSQL connection string
    pub async fn connect(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2) // Keep some connections alive
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600)) // Close idle connections after 10 minutes
            .max_lifetime(Duration::from_secs(1800)) // Recycle connections after 30 minutes
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Create the tables this store needs if they are missing.
    pub async fn init_schema(&self) -> Result<(), SqlxError> {
        sqlx::query(CREATE_DOCUMENTS_TABLE)
            .execute(&self.pool)
            .await?;
        sqlx::query(CREATE_SAVED_DOCUMENTS_TABLE)
            .execute(&self.pool)
            .await?;
        info!("Database schema ready");
        Ok(())
    }

    async fn exists(&self, document_id: &str) -> Result<bool, SqlxError> {
        let found: Option<(String,)> =
            sqlx::query_as("SELECT document_id FROM documents WHERE document_id = $1")
                .bind(document_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(found.is_some())
    }
}

fn is_unique_violation(e: &SqlxError) -> bool {
    e.as_database_error()
        .and_then(|db| db.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create_document(
        &self,
        document_id: &str,
        owner_id: &str,
        language: &str,
    ) -> Result<StoredDocument, StoreError> {
        let query_sql = r#"
            INSERT INTO documents (document_id, owner_id, language)
            VALUES ($1, $2, $3)
            RETURNING document_id, owner_id, content, language, permissions, created_at, updated_at
        "#;

        sqlx::query_as::<_, StoredDocument>(query_sql)
            .bind(document_id)
            .bind(owner_id)
            .bind(language)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::AlreadyExists(document_id.to_string())
                } else {
                    error!("Failed to create document {}: {}", document_id, e);
                    StoreError::Database(e)
                }
            })
    }

    async fn find_document(&self, document_id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let query_sql = r#"
            SELECT document_id, owner_id, content, language, permissions, created_at, updated_at
            FROM documents
            WHERE document_id = $1
        "#;

        let document = sqlx::query_as::<_, StoredDocument>(query_sql)
            .bind(document_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(document)
    }

    async fn save_document(
        &self,
        document_id: &str,
        content: &str,
        language: &str,
    ) -> Result<StoredDocument, StoreError> {
        let query_sql = r#"
            UPDATE documents
            SET content = $2, language = $3, updated_at = now()
            WHERE document_id = $1
            RETURNING document_id, owner_id, content, language, permissions, created_at, updated_at
        "#;

        let document = sqlx::query_as::<_, StoredDocument>(query_sql)
            .bind(document_id)
            .bind(content)
            .bind(language)
            .fetch_optional(&self.pool)
            .await?;

        match document {
            Some(document) => {
                info!("Document {} saved ({} bytes)", document_id, content.len());
                Ok(document)
            }
            None => Err(StoreError::NotFound(document_id.to_string())),
        }
    }

    async fn add_permission(&self, document_id: &str, user_id: &str) -> Result<(), StoreError> {
        let query_sql = r#"
            UPDATE documents
            SET permissions = array_append(permissions, $2), updated_at = now()
            WHERE document_id = $1 AND NOT ($2 = ANY(permissions))
        "#;

        let result = sqlx::query(query_sql)
            .bind(document_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 && !self.exists(document_id).await? {
            return Err(StoreError::NotFound(document_id.to_string()));
        }
        Ok(())
    }

    async fn mark_saved(&self, user_id: &str, document_id: &str) -> Result<(), StoreError> {
        if !self.exists(document_id).await? {
            return Err(StoreError::NotFound(document_id.to_string()));
        }

        sqlx::query(
            "INSERT INTO saved_documents (user_id, document_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(document_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn saved_documents(&self, user_id: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let query_sql = r#"
            SELECT d.document_id, d.owner_id, d.content, d.language, d.permissions, d.created_at, d.updated_at
            FROM saved_documents s
            JOIN documents d ON d.document_id = s.document_id
            WHERE s.user_id = $1
            ORDER BY s.saved_at
        "#;

        let documents = sqlx::query_as::<_, StoredDocument>(query_sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(documents)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
