//! Storage abstraction and implementations for opsctl.
//!
//! This crate provides the store handle a task's container owns: a
//! trait-based interface with a JSON-file reference implementation and an
//! optional SQLite backend.

#![warn(missing_docs)]

pub mod trait_;
pub mod json_storage;
#[cfg(feature = "sqlite")]
pub mod sqlite_storage;
pub mod config;

pub use trait_::{Storage, StorageError, Result, validate_name};
pub use json_storage::JsonStorage;
#[cfg(feature = "sqlite")]
pub use sqlite_storage::SqliteStorage;
pub use config::{Backend, StoreConfig, StorageOpener};
