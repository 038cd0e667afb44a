//! SQLite document store
//!
//! Documents are stored as JSON text in a single `documents` table keyed by
//! their full path. Each write bumps an integer version used for
//! conditional writes. Writes are serialized in-process so the
//! read-merge-write cycle of a merge write is atomic.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tokio::sync::Mutex;
use tracing::info;

use super::{
    merge, split_document_path, validate_collection_path, Document, DocumentStore, NetworkGate,
    OrderBy, SetMode, StoredDocument, Version,
};
use crate::{Error, Result};

/// Local SQLite-backed document store
pub struct SqliteStore {
    pool: SqlitePool,
    gate: NetworkGate,
    write_lock: Mutex<()>,
}

impl SqliteStore {
    /// Open (creating if needed) the store database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        let newly_created = !db_path.exists();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        if newly_created {
            info!("Initialized new notebook database: {}", db_path.display());
        } else {
            info!("Opened existing notebook database: {}", db_path.display());
        }

        // WAL allows readers alongside the single writer
        sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
        sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database (single connection)
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if needed
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        create_documents_table(&pool).await?;
        Ok(Self {
            pool,
            gate: NetworkGate::default(),
            write_lock: Mutex::new(()),
        })
    }

    async fn fetch(&self, path: &str) -> Result<Option<(Document, i64)>> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT data, version FROM documents WHERE path = ?")
                .bind(path)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((data, version)) => Ok(Some((parse_document(&data)?, version))),
            None => Ok(None),
        }
    }

    /// Caller must hold `write_lock`
    async fn write_locked(
        &self,
        path: &str,
        fields: Document,
        mode: SetMode,
        current: Option<(Document, i64)>,
    ) -> Result<()> {
        let (collection, doc_id) = split_document_path(path)?;

        let (doc, next_version) = match (mode, current) {
            (SetMode::Merge, Some((mut existing, version))) => {
                merge::merge_into(&mut existing, fields);
                (existing, version + 1)
            }
            (SetMode::Overwrite, Some((_, version))) => (fields, version + 1),
            (_, None) => (fields, 1),
        };

        let data = serde_json::to_string(&Value::Object(doc))?;

        sqlx::query(
            r#"
            INSERT INTO documents (path, collection, doc_id, data, version, updated_at)
            VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(path) DO UPDATE SET
                data = excluded.data,
                version = excluded.version,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(path)
        .bind(&collection)
        .bind(&doc_id)
        .bind(&data)
        .bind(next_version)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

async fn create_documents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            path TEXT PRIMARY KEY,
            collection TEXT NOT NULL,
            doc_id TEXT NOT NULL,
            data TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 1,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection)")
        .execute(pool)
        .await?;

    Ok(())
}

fn parse_document(data: &str) -> Result<Document> {
    match serde_json::from_str::<Value>(data)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Internal(format!(
            "Stored document is not an object: {}",
            other
        ))),
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn get_versioned(&self, path: &str) -> Result<Option<(Document, Version)>> {
        self.gate.check()?;
        split_document_path(path)?;
        Ok(self
            .fetch(path)
            .await?
            .map(|(doc, version)| (doc, Version(version.to_string()))))
    }

    async fn set(&self, path: &str, fields: Document, mode: SetMode) -> Result<()> {
        self.gate.check()?;
        let _guard = self.write_lock.lock().await;
        let current = self.fetch(path).await?;
        self.write_locked(path, fields, mode, current).await
    }

    async fn set_if_version(
        &self,
        path: &str,
        fields: Document,
        mode: SetMode,
        expected: Option<&Version>,
    ) -> Result<()> {
        self.gate.check()?;
        let _guard = self.write_lock.lock().await;
        let current = self.fetch(path).await?;

        let current_version = current.as_ref().map(|(_, v)| v.to_string());
        let expected_version = expected.map(|v| v.0.clone());
        if current_version != expected_version {
            return Err(Error::Conflict(format!(
                "{} changed (expected version {:?}, found {:?})",
                path, expected_version, current_version
            )));
        }

        self.write_locked(path, fields, mode, current).await
    }

    async fn list(&self, collection: &str, order: Option<&OrderBy>) -> Result<Vec<StoredDocument>> {
        self.gate.check()?;
        validate_collection_path(collection)?;

        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT doc_id, data FROM documents WHERE collection = ? ORDER BY doc_id")
                .bind(collection)
                .fetch_all(&self.pool)
                .await?;

        let mut docs = rows
            .into_iter()
            .map(|(id, data)| {
                Ok(StoredDocument {
                    id,
                    fields: parse_document(&data)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(order) = order {
            order.apply(&mut docs);
        }
        Ok(docs)
    }

    async fn enable_network(&self) -> Result<()> {
        self.gate.enable();
        Ok(())
    }

    async fn disable_network(&self) -> Result<()> {
        self.gate.disable();
        Ok(())
    }

    fn is_online(&self) -> bool {
        self.gate.is_online()
    }
}
