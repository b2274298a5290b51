//! Store configuration and opening.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{JsonStorage, Result, Storage, StorageError};

/// Which backend a store uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// One JSON file per item under a directory
    #[default]
    Json,
    /// A SQLite database file (requires the `sqlite` feature)
    Sqlite,
}

impl std::str::FromStr for Backend {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Backend::Json),
            "sqlite" => Ok(Backend::Sqlite),
            other => Err(StorageError::Other(format!("unknown backend: {other}"))),
        }
    }
}

/// Configuration for opening a store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Backend kind
    pub backend: Backend,
    /// Directory (json) or database path (sqlite)
    pub location: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Json,
            location: PathBuf::from(".opsctl"),
        }
    }
}

/// Something that can open a store handle.
///
/// The task harness calls this at most once per task chain.
#[async_trait]
pub trait StorageOpener: Send + Sync {
    /// Open a new handle.
    async fn open(&self) -> Result<Arc<dyn Storage>>;
}

#[async_trait]
impl StorageOpener for StoreConfig {
    async fn open(&self) -> Result<Arc<dyn Storage>> {
        info!(backend = ?self.backend, location = %self.location.display(), "opening store");
        match self.backend {
            Backend::Json => Ok(Arc::new(JsonStorage::new(&self.location).await?)),
            #[cfg(feature = "sqlite")]
            Backend::Sqlite => Ok(Arc::new(
                super::SqliteStorage::new_from_path(&self.location).await?,
            )),
            #[cfg(not(feature = "sqlite"))]
            Backend::Sqlite => Err(StorageError::Other(
                "sqlite backend requires the `sqlite` feature".to_string(),
            )),
        }
    }
}
