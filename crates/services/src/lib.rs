//! Domain services for opsctl tasks.
//!
//! A [`Container`] bundles the services below with the store handle they
//! share. Administrative tasks receive a container and call into it exactly
//! as the main application would.

#![warn(missing_docs)]

pub mod audit;
pub mod container;
pub mod crypto;
pub mod records;

pub use audit::{AuditDetail, AuditLog, AuditSink};
pub use container::Container;
pub use crypto::Crypto;
pub use records::{IntegrityReport, Mismatch, RecordService, RepairSummary};
