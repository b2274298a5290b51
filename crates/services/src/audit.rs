//! Audit log service.

use async_trait::async_trait;
use opsctl_core::{AgentId, AuditEntry, AuditFilter};
use opsctl_storage::{Result, Storage};
use std::sync::Arc;
use tracing::debug;

/// Outcome detail handed to an audit sink.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditDetail {
    /// Whether the audited action succeeded
    pub success: bool,
    /// Result value on success, serialized problem or null on failure
    pub payload: serde_json::Value,
}

/// Append-only destination for audit entries.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Append one entry.
    async fn append(
        &self,
        actor: Option<AgentId>,
        action: &str,
        target: Option<String>,
        detail: AuditDetail,
    ) -> Result<()>;
}

/// Audit log bound to a store.
#[derive(Clone)]
pub struct AuditLog {
    store: Arc<dyn Storage>,
}

impl AuditLog {
    /// Create the service over a store handle.
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    /// Read the trail, oldest first.
    pub async fn list(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>> {
        self.store.list_audit(filter).await
    }
}

#[async_trait]
impl AuditSink for AuditLog {
    async fn append(
        &self,
        actor: Option<AgentId>,
        action: &str,
        target: Option<String>,
        detail: AuditDetail,
    ) -> Result<()> {
        let mut entry = AuditEntry::new(action, detail.success, detail.payload);
        entry.actor = actor;
        entry.target = target;

        debug!(id = %entry.id, action, success = entry.success, "appending audit entry");
        self.store.append_audit(&entry).await
    }
}
