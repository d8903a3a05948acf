// src/database.rs
//! Per-user document persistence.
//!
//! Documents are JSON bodies addressed by slash-separated paths such as
//! `users/{uid}/roadmaps/{careerTitle}`. Writes overwrite whatever is at the
//! path (last writer wins); there are no transactions or conflict checks.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: String,
    pub body: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct DocumentRow {
    path: String,
    body: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<DocumentRow> for Document {
    type Error = anyhow::Error;

    fn try_from(row: DocumentRow) -> Result<Self> {
        let body = serde_json::from_str(&row.body)
            .with_context(|| format!("Corrupted document body at {}", row.path))?;
        Ok(Document {
            path: row.path,
            body,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[rocket::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or fully replace the document at `path`.
    async fn set_document(&self, path: &str, body: &Value) -> Result<()>;

    async fn get_document(&self, path: &str) -> Result<Option<Document>>;

    /// Direct children of `collection`, ordered by path.
    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>>;
}

/// Escape a value for use as a single path segment.
///
/// `%` and `/` are percent-encoded, so distinct values never share a path.
pub fn document_id(segment: &str) -> String {
    segment.trim().replace('%', "%25").replace('/', "%2F")
}

pub fn profile_path(uid: &str) -> String {
    format!("users/{}", document_id(uid))
}

pub fn analyses_collection(uid: &str) -> String {
    format!("{}/analyses", profile_path(uid))
}

pub fn analysis_path(uid: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}/{}",
        analyses_collection(uid),
        at.to_rfc3339_opts(SecondsFormat::Nanos, true)
    )
}

pub fn roadmaps_collection(uid: &str) -> String {
    format!("{}/roadmaps", profile_path(uid))
}

pub fn roadmap_path(uid: &str, career_title: &str) -> String {
    format!("{}/{}", roadmaps_collection(uid), document_id(career_title))
}

fn parent_collection(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    /// Open (creating if needed) the database file and run migrations.
    pub async fn open(database_path: &Path) -> Result<Self> {
        if let Some(parent) = database_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", database_path.display());
        let pool = SqlitePool::connect(&database_url)
            .await
            .with_context(|| format!("Failed to connect to database: {}", database_path.display()))?;

        info!("Database connection established: {}", database_path.display());
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Private in-memory database, used by tests and dry runs.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Invalid in-memory SQLite URL")?;
        // every connection to :memory: is a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .context("Failed to open in-memory database")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                path TEXT PRIMARY KEY NOT NULL,
                collection TEXT NOT NULL,
                body TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create documents table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection);")
            .execute(&self.pool)
            .await?;

        info!("Database migrations completed");
        Ok(())
    }
}

#[rocket::async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn set_document(&self, path: &str, body: &Value) -> Result<()> {
        let now = Utc::now();
        let body = serde_json::to_string(body).context("Failed to serialize document")?;

        sqlx::query(
            r#"
            INSERT INTO documents (path, collection, body, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(path)
        .bind(parent_collection(path))
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to write document {}", path))?;

        debug!("Stored document {}", path);
        Ok(())
    }

    async fn get_document(&self, path: &str) -> Result<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT path, body, created_at, updated_at FROM documents WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to read document {}", path))?;

        row.map(Document::try_from).transpose()
    }

    async fn list_documents(&self, collection: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT path, body, created_at, updated_at
            FROM documents
            WHERE collection = ?
            ORDER BY path ASC
            "#,
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to list collection {}", collection))?;

        rows.into_iter().map(Document::try_from).collect()
    }
}
