//! Storage trait abstraction.

use async_trait::async_trait;
use opsctl_core::{AuditEntry, AuditFilter, Record, RecordFilter};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQL error
    #[cfg(feature = "sqlite")]
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    /// A collection or key that cannot be used as a storage name
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// The handle was closed
    #[error("Store is closed")]
    Closed,

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Storage abstraction for opsctl data.
///
/// One open store is the resource handle owned by a task's container. The
/// handle is shared by reference across every step of a task chain, so all
/// operations take `&self`.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Record operations ===

    /// Save a record (create or update).
    async fn save_record(&self, record: &Record) -> Result<()>;

    /// Load a record by collection and key.
    async fn load_record(&self, collection: &str, key: &str) -> Result<Option<Record>>;

    /// List records matching the filter, ordered by collection then key.
    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<Record>>;

    /// Delete a record. Returns whether it existed.
    async fn delete_record(&self, collection: &str, key: &str) -> Result<bool>;

    // === Audit operations ===

    /// Append an audit entry.
    async fn append_audit(&self, entry: &AuditEntry) -> Result<()>;

    /// List audit entries in chronological order.
    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>>;

    // === Lifecycle ===

    /// Release the handle.
    ///
    /// Synchronous and idempotent. Backends that need async shutdown start
    /// it here without waiting for it. Every later operation fails with
    /// [`StorageError::Closed`].
    fn close(&self);

    /// Whether `close` has been called.
    fn is_closed(&self) -> bool;
}

/// Reject names that are empty or could escape a storage directory.
pub fn validate_name(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if ok {
        Ok(())
    } else {
        Err(StorageError::InvalidName(name.to_string()))
    }
}

/// Keep the most recent `limit` entries of a chronological list.
pub(crate) fn keep_latest<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        if items.len() > limit {
            items.drain(..items.len() - limit);
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("users").is_ok());
        assert!(validate_name("user-01.v2").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("..").is_err());
        assert!(validate_name("a/b").is_err());
        assert!(validate_name("a b").is_err());
    }

    #[test]
    fn test_keep_latest() {
        assert_eq!(keep_latest(vec![1, 2, 3, 4], Some(2)), vec![3, 4]);
        assert_eq!(keep_latest(vec![1, 2], Some(5)), vec![1, 2]);
        assert_eq!(keep_latest(vec![1, 2], None), vec![1, 2]);
    }
}
