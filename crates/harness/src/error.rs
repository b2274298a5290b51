//! Harness errors.

use opsctl_storage::StorageError;

/// Errors raised by the harness itself rather than by a task body.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The store behind a new container could not be opened
    #[error("failed to open store")]
    Open(#[source] StorageError),

    /// A task's result could not be turned into printable output
    #[error("failed to serialize task output")]
    Output(#[source] serde_json::Error),
}
