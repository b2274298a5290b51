//! In-memory store, openers and sinks for harness tests.

use async_trait::async_trait;
use opsctl_core::{AgentId, AuditEntry, AuditFilter, Record, RecordFilter};
use opsctl_services::{AuditDetail, AuditSink};
use opsctl_storage::{Result, Storage, StorageError, StorageOpener};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Open/close counters shared between an opener and the test.
#[derive(Clone, Default)]
pub struct Stats {
    opens: Arc<AtomicUsize>,
    closes: Arc<AtomicUsize>,
}

impl Stats {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<BTreeMap<(String, String), Record>>,
    audit: Mutex<Vec<AuditEntry>>,
    closed: AtomicBool,
    closes: Arc<AtomicUsize>,
    panic_on_close: bool,
}

impl MemoryStore {
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Storage for MemoryStore {
    async fn save_record(&self, record: &Record) -> Result<()> {
        self.ensure_open()?;
        self.records
            .lock()
            .unwrap()
            .insert((record.collection.clone(), record.key.clone()), record.clone());
        Ok(())
    }

    async fn load_record(&self, collection: &str, key: &str) -> Result<Option<Record>> {
        self.ensure_open()?;
        let records = self.records.lock().unwrap();
        Ok(records.get(&(collection.to_string(), key.to_string())).cloned())
    }

    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<Record>> {
        self.ensure_open()?;
        let records = self.records.lock().unwrap();
        Ok(records
            .values()
            .filter(|r| filter.collection.as_ref().map_or(true, |c| &r.collection == c))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn delete_record(&self, collection: &str, key: &str) -> Result<bool> {
        self.ensure_open()?;
        let mut records = self.records.lock().unwrap();
        Ok(records.remove(&(collection.to_string(), key.to_string())).is_some())
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<()> {
        self.ensure_open()?;
        self.audit.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        self.ensure_open()?;
        let audit = self.audit.lock().unwrap();
        Ok(audit.iter().filter(|e| filter.matches(e)).cloned().collect())
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        if self.panic_on_close {
            panic!("close failed");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Opens a fresh [`MemoryStore`] every time and counts opens and closes.
pub struct CountingOpener {
    stats: Stats,
    panic_on_close: bool,
}

impl CountingOpener {
    pub fn new() -> (Self, Stats) {
        let stats = Stats::default();
        (Self { stats: stats.clone(), panic_on_close: false }, stats)
    }

    pub fn panicking_on_close() -> (Self, Stats) {
        let stats = Stats::default();
        (Self { stats: stats.clone(), panic_on_close: true }, stats)
    }
}

#[async_trait]
impl StorageOpener for CountingOpener {
    async fn open(&self) -> Result<Arc<dyn Storage>> {
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MemoryStore {
            closes: self.stats.closes.clone(),
            panic_on_close: self.panic_on_close,
            ..Default::default()
        }))
    }
}

/// Never manages to open a store.
pub struct FailingOpener;

#[async_trait]
impl StorageOpener for FailingOpener {
    async fn open(&self) -> Result<Arc<dyn Storage>> {
        Err(StorageError::Other("database is locked".to_string()))
    }
}

/// Audit sink whose appends always fail.
pub struct FailingSink;

#[async_trait]
impl AuditSink for FailingSink {
    async fn append(
        &self,
        _actor: Option<AgentId>,
        _action: &str,
        _target: Option<String>,
        _detail: AuditDetail,
    ) -> Result<()> {
        Err(StorageError::Other("audit volume full".to_string()))
    }
}
