//! Audit model - the append-only trail of administrative actions.

use crate::id::{AgentId, AuditId};
use crate::Time;
use serde::{Deserialize, Serialize};

/// One entry in the audit trail.
///
/// Written once per audited task, after the task settles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier
    pub id: AuditId,

    /// When it was recorded
    pub timestamp: Time,

    /// Who performed the action, if known
    pub actor: Option<AgentId>,

    /// Operation category, e.g. `record.put`
    pub action: String,

    /// What the action touched, if it can be named
    pub target: Option<String>,

    /// Whether the action succeeded
    pub success: bool,

    /// The result on success, a serialized problem (or null) on failure
    pub detail: serde_json::Value,
}

impl AuditEntry {
    /// Create a new entry with no actor and no target.
    pub fn new(action: impl Into<String>, success: bool, detail: serde_json::Value) -> Self {
        Self {
            id: AuditId::new(),
            timestamp: chrono::Utc::now(),
            actor: None,
            action: action.into(),
            target: None,
            success,
            detail,
        }
    }
}

/// Filter for reading the audit trail.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    /// Only entries with this action
    pub action: Option<String>,

    /// Only successful (`Some(true)`) or failed (`Some(false)`) entries
    pub success: Option<bool>,

    /// Keep only the most recent `limit` entries
    pub limit: Option<usize>,
}

impl AuditFilter {
    /// Whether an entry passes the action/success criteria.
    ///
    /// `limit` is applied by the store after ordering.
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(action) = &self.action {
            if &entry.action != action {
                return false;
            }
        }
        if let Some(success) = self.success {
            if entry.success != success {
                return false;
            }
        }
        true
    }
}
