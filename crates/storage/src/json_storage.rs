//! JSON file storage implementation.
//!
//! Stores each record as `records/<collection>/<key>.json` and each audit
//! entry as `audit/<id>.json` under a root directory. Writes go through a
//! temporary file and a rename so a crashed task never leaves half a record.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use opsctl_core::{AuditEntry, AuditFilter, Record, RecordFilter};
use super::trait_::{keep_latest, validate_name};
use super::{Storage, StorageError, Result};
use tokio::fs;
use tracing::{debug, warn};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: PathBuf,
    closed: AtomicBool,
}

impl JsonStorage {
    /// Open storage rooted at `root`, creating the `records/` and `audit/`
    /// directories if needed.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("records")).await?;
        fs::create_dir_all(root.join("audit")).await?;

        debug!(root = %root.display(), "opened json store");
        Ok(Self {
            root,
            closed: AtomicBool::new(false),
        })
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root.join("records").join(collection)
    }

    fn record_path(&self, collection: &str, key: &str) -> PathBuf {
        self.collection_dir(collection).join(format!("{}.json", key))
    }

    fn audit_path(&self, entry: &AuditEntry) -> PathBuf {
        self.root.join("audit").join(format!("{}.json", entry.id))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn save_record(&self, record: &Record) -> Result<()> {
        self.ensure_open()?;
        validate_name(&record.collection)?;
        validate_name(&record.key)?;

        fs::create_dir_all(self.collection_dir(&record.collection)).await?;
        let json = serde_json::to_string_pretty(record)?;
        write_atomic(&self.record_path(&record.collection, &record.key), json.as_bytes()).await
    }

    async fn load_record(&self, collection: &str, key: &str) -> Result<Option<Record>> {
        self.ensure_open()?;
        validate_name(collection)?;
        validate_name(key)?;
        read_json(&self.record_path(collection, key)).await
    }

    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<Record>> {
        self.ensure_open()?;

        let collections = match &filter.collection {
            Some(name) => {
                validate_name(name)?;
                vec![name.clone()]
            }
            None => list_subdirs(&self.root.join("records")).await?,
        };

        let mut records = Vec::new();
        for collection in collections {
            let dir = self.collection_dir(&collection);
            if fs::metadata(&dir).await.is_err() {
                continue;
            }
            records.extend(list_dir::<Record>(&dir).await?);
        }
        records.sort_by(|a, b| (&a.collection, &a.key).cmp(&(&b.collection, &b.key)));
        if let Some(limit) = filter.limit {
            records.truncate(limit);
        }
        Ok(records)
    }

    async fn delete_record(&self, collection: &str, key: &str) -> Result<bool> {
        self.ensure_open()?;
        validate_name(collection)?;
        validate_name(key)?;

        match fs::remove_file(self.record_path(collection, key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.ensure_open()?;
        let json = serde_json::to_string_pretty(entry)?;
        write_atomic(&self.audit_path(entry), json.as_bytes()).await
    }

    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        self.ensure_open()?;
        let mut entries: Vec<AuditEntry> = list_dir(&self.root.join("audit")).await?;
        entries.retain(|e| filter.matches(e));
        entries.sort_by(|a, b| (a.timestamp, a.id).cmp(&(b.timestamp, b.id)));
        Ok(keep_latest(entries, filter.limit))
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(root = %self.root.display(), "closed json store");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        match read_json(&path).await {
            Ok(Some(item)) => items.push(item),
            Ok(None) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable file"),
        }
    }
    Ok(items)
}

async fn list_subdirs(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(collection: &str, key: &str) -> Record {
        Record::new(collection, key, json!({"name": key}), "sum")
    }

    #[tokio::test]
    async fn test_record_operations() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();

        storage.save_record(&record("users", "bob")).await.unwrap();
        storage.save_record(&record("users", "alice")).await.unwrap();
        storage.save_record(&record("teams", "core")).await.unwrap();

        let loaded = storage.load_record("users", "bob").await.unwrap().unwrap();
        assert_eq!(loaded.data["name"], "bob");
        assert!(storage.load_record("users", "carol").await.unwrap().is_none());

        let users = storage.list_records(&RecordFilter::collection("users")).await.unwrap();
        let keys: Vec<_> = users.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["alice", "bob"]);

        let all = storage.list_records(&RecordFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].collection, "teams");

        assert!(storage.delete_record("users", "bob").await.unwrap());
        assert!(!storage.delete_record("users", "bob").await.unwrap());
    }

    #[tokio::test]
    async fn test_missing_collection_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let records = storage.list_records(&RecordFilter::collection("none")).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();
        let err = storage.load_record("..", "passwd").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidName(_)));
    }

    #[tokio::test]
    async fn test_audit_is_chronological_and_limited() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();

        for i in 0..4 {
            let entry = AuditEntry::new("record.put", i % 2 == 0, json!({"n": i}));
            storage.append_audit(&entry).await.unwrap();
        }

        let all = storage.list_audit(&AuditFilter::default()).await.unwrap();
        let ns: Vec<_> = all.iter().map(|e| e.detail["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, vec![0, 1, 2, 3]);

        let latest = storage
            .list_audit(&AuditFilter { limit: Some(1), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(latest[0].detail["n"], 3);

        let failed = storage
            .list_audit(&AuditFilter { success: Some(false), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(failed.len(), 2);
    }

    #[tokio::test]
    async fn test_closed_store_rejects_operations() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(dir.path()).await.unwrap();

        storage.close();
        storage.close();
        assert!(storage.is_closed());

        let err = storage.load_record("users", "bob").await.unwrap_err();
        assert!(matches!(err, StorageError::Closed));
    }
}
