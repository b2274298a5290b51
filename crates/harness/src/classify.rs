//! Error classification and output serialization.

use crate::error::HarnessError;
use opsctl_core::Problem;
use serde::Serialize;

/// Find the user-facing problem behind an error, if there is one.
///
/// Context added on top of a problem does not hide it.
pub fn classify(err: &anyhow::Error) -> Option<&Problem> {
    err.chain().find_map(|cause| cause.downcast_ref::<Problem>())
}

/// Structured description of an error for the audit trail.
///
/// Opaque errors serialize to `null`.
pub fn serialize_problem(err: &anyhow::Error) -> serde_json::Value {
    classify(err)
        .and_then(|problem| serde_json::to_value(problem).ok())
        .unwrap_or(serde_json::Value::Null)
}

/// Convert a task result into its printable form.
pub fn to_printable<T: Serialize + ?Sized>(value: &T) -> Result<serde_json::Value, HarnessError> {
    serde_json::to_value(value).map_err(HarnessError::Output)
}
