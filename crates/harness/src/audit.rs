//! Audit wrapper - record a task's outcome without changing it.
//!
//! Auditing happens in two phases. [`record`] drives the task and commits
//! one audit entry, keeping both results side by side in an [`Audited`].
//! [`Audited::settle`] then reports a failed commit on the console and
//! hands back the task's own outcome untouched.

use crate::classify::serialize_problem;
use crate::console::Console;
use crate::task::Task;
use opsctl_services::{AuditDetail, AuditSink};
use opsctl_storage::StorageError;
use serde::Serialize;
use tracing::{error, warn};

/// A task outcome paired with the result of committing its audit entry.
#[derive(Debug)]
pub struct Audited<T> {
    action: String,
    outcome: anyhow::Result<T>,
    commit: Result<(), StorageError>,
}

impl<T> Audited<T> {
    /// The task's outcome.
    pub fn outcome(&self) -> &anyhow::Result<T> {
        &self.outcome
    }

    /// Whether the audit entry was written.
    pub fn committed(&self) -> bool {
        self.commit.is_ok()
    }

    /// Report a failed commit, then pass the task's outcome through.
    pub fn settle(self, console: &Console) -> anyhow::Result<T> {
        if let Err(err) = self.commit {
            error!(action = %self.action, error = %err, "audit logging failed");
            console.diagnostic(&format!("Failed to write audit log for {}", self.action));
            console.report(&anyhow::Error::new(err));
        }
        self.outcome
    }
}

/// Drive `task` and append one audit entry describing how it settled.
///
/// On success the entry's detail is the task's value; on failure it is the
/// serialized problem, or null for opaque errors.
pub async fn record<'a, T: Serialize + 'a>(
    sink: &dyn AuditSink,
    action: &str,
    task: Task<'a, T>,
) -> Audited<T> {
    let outcome = task.await;

    let detail = match &outcome {
        Ok(value) => AuditDetail {
            success: true,
            payload: serde_json::to_value(value).unwrap_or_else(|err| {
                warn!(action, error = %err, "task result is not serializable; auditing null");
                serde_json::Value::Null
            }),
        },
        Err(err) => AuditDetail {
            success: false,
            payload: serialize_problem(err),
        },
    };

    let commit = sink.append(None, action, None, detail).await;
    Audited {
        action: action.to_string(),
        outcome,
        commit,
    }
}

/// Run `task` with auditing and return its original outcome.
pub async fn audited<'a, T: Serialize + 'a>(
    sink: &dyn AuditSink,
    console: &Console,
    action: &str,
    task: Task<'a, T>,
) -> anyhow::Result<T> {
    record(sink, action, task).await.settle(console)
}
