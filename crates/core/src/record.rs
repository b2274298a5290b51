//! Record model - the documents administrative tasks operate on.

use crate::Time;
use serde::{Deserialize, Serialize};

/// A JSON document stored under `collection/key`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Collection the record belongs to
    pub collection: String,

    /// Key, unique within the collection
    pub key: String,

    /// Document body
    pub data: serde_json::Value,

    /// Incremented on every save
    pub version: u64,

    /// Content checksum of `data` at the time of the last save
    pub checksum: String,

    /// Creation timestamp
    pub created_at: Time,

    /// Last update timestamp
    pub updated_at: Time,
}

impl Record {
    /// Create a first-version record.
    pub fn new(
        collection: impl Into<String>,
        key: impl Into<String>,
        data: serde_json::Value,
        checksum: impl Into<String>,
    ) -> Self {
        let now = chrono::Utc::now();
        Self {
            collection: collection.into(),
            key: key.into(),
            data,
            version: 1,
            checksum: checksum.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// `collection/key`, used as the audit target.
    pub fn path(&self) -> String {
        format!("{}/{}", self.collection, self.key)
    }
}

/// Filter for listing records.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Only records from this collection
    pub collection: Option<String>,

    /// Maximum number of records to return
    pub limit: Option<usize>,
}

impl RecordFilter {
    /// Records of a single collection.
    pub fn collection(name: impl Into<String>) -> Self {
        Self {
            collection: Some(name.into()),
            limit: None,
        }
    }
}
