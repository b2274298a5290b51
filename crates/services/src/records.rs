//! Record service - reads, writes and integrity checks over stored records.

use crate::crypto::Crypto;
use opsctl_core::{Problem, Record, RecordFilter};
use opsctl_storage::Storage;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// A record whose stored checksum no longer matches its data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mismatch {
    /// Collection
    pub collection: String,
    /// Key
    pub key: String,
    /// Checksum stored on the record
    pub stored: String,
    /// Checksum of the current data
    pub actual: String,
}

/// Result of an integrity scan.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    /// Number of records scanned
    pub checked: usize,
    /// Records that failed the check
    pub mismatched: Vec<Mismatch>,
}

impl IntegrityReport {
    /// Whether every record passed.
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty()
    }
}

/// Result of a repair pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairSummary {
    /// `collection/key` of every record rewritten
    pub repaired: Vec<String>,
    /// Mismatches whose record disappeared before it could be repaired
    pub skipped: Vec<String>,
}

/// Record service bound to a store.
#[derive(Clone)]
pub struct RecordService {
    store: Arc<dyn Storage>,
    crypto: Crypto,
}

impl RecordService {
    /// Create the service.
    pub fn new(store: Arc<dyn Storage>, crypto: Crypto) -> Self {
        Self { store, crypto }
    }

    /// Load a record if it exists.
    pub async fn get(&self, collection: &str, key: &str) -> anyhow::Result<Option<Record>> {
        Ok(self.store.load_record(collection, key).await?)
    }

    /// Load a record, failing with a 404 problem when it does not exist.
    pub async fn require(&self, collection: &str, key: &str) -> anyhow::Result<Record> {
        self.get(collection, key)
            .await?
            .ok_or_else(|| not_found(collection, key).into())
    }

    /// Create or replace a record's data.
    ///
    /// Existing records keep their creation time and get a new version.
    pub async fn put(
        &self,
        collection: &str,
        key: &str,
        data: serde_json::Value,
    ) -> anyhow::Result<Record> {
        let checksum = self.crypto.checksum(&data);
        let record = match self.get(collection, key).await? {
            Some(mut existing) => {
                existing.data = data;
                existing.checksum = checksum;
                existing.version += 1;
                existing.updated_at = chrono::Utc::now();
                existing
            }
            None => Record::new(collection, key, data, checksum),
        };

        self.store.save_record(&record).await?;
        debug!(path = %record.path(), version = record.version, "saved record");
        Ok(record)
    }

    /// Delete a record, returning what was removed.
    pub async fn delete(&self, collection: &str, key: &str) -> anyhow::Result<Record> {
        let record = self.require(collection, key).await?;
        if !self.store.delete_record(collection, key).await? {
            return Err(not_found(collection, key).into());
        }
        Ok(record)
    }

    /// List records.
    pub async fn list(&self, filter: &RecordFilter) -> anyhow::Result<Vec<Record>> {
        Ok(self.store.list_records(filter).await?)
    }

    /// Recompute every record's checksum and report the ones that differ.
    pub async fn verify(&self, filter: &RecordFilter) -> anyhow::Result<IntegrityReport> {
        let records = self.list(filter).await?;
        let mut report = IntegrityReport {
            checked: records.len(),
            mismatched: Vec::new(),
        };

        for record in records {
            let actual = self.crypto.checksum(&record.data);
            if actual != record.checksum {
                warn!(path = %record.path(), "checksum mismatch");
                report.mismatched.push(Mismatch {
                    collection: record.collection,
                    key: record.key,
                    stored: record.checksum,
                    actual,
                });
            }
        }

        info!(checked = report.checked, mismatched = report.mismatched.len(), "verified records");
        Ok(report)
    }

    /// Rewrite the checksum of every mismatched record in `report`.
    pub async fn repair(&self, report: &IntegrityReport) -> anyhow::Result<RepairSummary> {
        let mut summary = RepairSummary::default();

        for mismatch in &report.mismatched {
            let path = format!("{}/{}", mismatch.collection, mismatch.key);
            let Some(mut record) = self.get(&mismatch.collection, &mismatch.key).await? else {
                summary.skipped.push(path);
                continue;
            };

            record.checksum = self.crypto.checksum(&record.data);
            record.version += 1;
            record.updated_at = chrono::Utc::now();
            self.store.save_record(&record).await?;
            summary.repaired.push(path);
        }

        info!(repaired = summary.repaired.len(), skipped = summary.skipped.len(), "repaired records");
        Ok(summary)
    }
}

fn not_found(collection: &str, key: &str) -> Problem {
    Problem::not_found(format!("Record not found: {}/{}", collection, key))
}
