//! SQLite storage backend for opsctl.
//!
//! Records live in a `records` table keyed by `(collection, key)`; audit
//! entries live in an append-only `audit` table. Documents are stored as
//! JSON text.

use async_trait::async_trait;
use opsctl_core::{AuditEntry, AuditFilter, Record, RecordFilter};
use sqlx::Row;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use super::trait_::{keep_latest, validate_name, Storage, StorageError, Result};

/// SQLite storage implementation.
pub struct SqliteStorage {
    /// Database connection pool
    pool: sqlx::SqlitePool,
    closed: AtomicBool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance, creating the database file if
    /// it does not exist.
    pub async fn new(db_url: &str) -> Result<Self> {
        let options: sqlx::sqlite::SqliteConnectOptions = db_url.parse()?;
        let pool = sqlx::SqlitePool::connect_with(options.create_if_missing(true)).await?;

        let storage = Self {
            pool,
            closed: AtomicBool::new(false),
        };
        storage.init_schema().await?;

        debug!(url = db_url, "opened sqlite store");
        Ok(storage)
    }

    /// Create a new SQLite storage instance from a path.
    pub async fn new_from_path(path: &Path) -> Result<Self> {
        let path = path
            .to_str()
            .ok_or_else(|| StorageError::Other(format!("non UTF-8 path: {}", path.display())))?;
        Self::new(&format!("sqlite://{}", path)).await
    }

    /// Create an in-memory SQLite storage for testing.
    ///
    /// The pool is pinned to one connection so every query sees the same
    /// in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let storage = Self {
            pool,
            closed: AtomicBool::new(false),
        };
        storage.init_schema().await?;

        Ok(storage)
    }

    /// Initialize the database schema.
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS records (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, key)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS audit (
                id TEXT PRIMARY KEY,
                action TEXT NOT NULL,
                success INTEGER NOT NULL,
                data TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_audit_action ON audit(action)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(row: &sqlx::sqlite::SqliteRow) -> Result<T> {
        let data: String = row.try_get("data")?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Check if the database is healthy.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn save_record(&self, record: &Record) -> Result<()> {
        self.ensure_open()?;
        validate_name(&record.collection)?;
        validate_name(&record.key)?;
        let data = serde_json::to_string(record)?;

        sqlx::query(
            "INSERT OR REPLACE INTO records (collection, key, data, updated_at)
            VALUES (?, ?, ?, ?)",
        )
        .bind(&record.collection)
        .bind(&record.key)
        .bind(data)
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_record(&self, collection: &str, key: &str) -> Result<Option<Record>> {
        self.ensure_open()?;
        validate_name(collection)?;
        validate_name(key)?;
        let row = sqlx::query("SELECT data FROM records WHERE collection = ? AND key = ?")
            .bind(collection)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::decode).transpose()
    }

    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<Record>> {
        self.ensure_open()?;
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        let rows = match &filter.collection {
            Some(collection) => {
                sqlx::query(
                    "SELECT data FROM records WHERE collection = ? ORDER BY collection, key LIMIT ?",
                )
                .bind(collection)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query("SELECT data FROM records ORDER BY collection, key LIMIT ?")
                    .bind(limit)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(Self::decode).collect()
    }

    async fn delete_record(&self, collection: &str, key: &str) -> Result<bool> {
        self.ensure_open()?;
        validate_name(collection)?;
        validate_name(key)?;
        let result = sqlx::query("DELETE FROM records WHERE collection = ? AND key = ?")
            .bind(collection)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.ensure_open()?;
        let data = serde_json::to_string(entry)?;

        sqlx::query("INSERT INTO audit (id, action, success, data, created_at) VALUES (?, ?, ?, ?, ?)")
            .bind(entry.id.to_string())
            .bind(&entry.action)
            .bind(entry.success)
            .bind(data)
            .bind(entry.timestamp.to_rfc3339())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        self.ensure_open()?;
        let rows = sqlx::query("SELECT data FROM audit ORDER BY created_at, id")
            .fetch_all(&self.pool)
            .await?;

        let entries = rows
            .iter()
            .map(Self::decode::<AuditEntry>)
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .filter(|e| filter.matches(e))
            .collect();
        Ok(keep_latest(entries, filter.limit))
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let pool = self.pool.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move { pool.close().await });
            }
            Err(_) => warn!("no runtime to close sqlite pool; connections drop with the store"),
        }
        debug!("closing sqlite store");
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
