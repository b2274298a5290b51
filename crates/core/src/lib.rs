//! opsctl core data models.
//!
//! This crate defines the data structures shared by the store, the domain
//! services and the task harness.

#![warn(missing_docs)]

mod id;
mod audit;
mod record;
mod problem;

pub use id::*;
pub use audit::{AuditEntry, AuditFilter};
pub use record::{Record, RecordFilter};
pub use problem::Problem;

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
