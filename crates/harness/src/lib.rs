//! Execution harness for standalone administrative tasks.
//!
//! A task is built from a [`Task`], optionally wrapped with [`audited`],
//! and handed to a [`Runner`]:
//!
//! ```text
//! Lifecycle::scoped ─► task body ─► audited ─► Runner::run ─► stdout / stderr + exit code
//! ```
//!
//! [`Lifecycle`] creates the service container the first time a chain
//! needs it and releases it once the chain settles.

#![warn(missing_docs)]

pub mod audit;
pub mod classify;
pub mod console;
pub mod error;
pub mod lifecycle;
pub mod runner;
pub mod task;

#[cfg(test)]
mod test_support;

pub use audit::{audited, record, Audited};
pub use classify::{classify, serialize_problem, to_printable};
pub use console::{Capture, Console, SharedBuffer};
pub use error::HarnessError;
pub use lifecycle::{ContainerHandle, Lifecycle, Ownership};
pub use runner::{RunStatus, Runner};
pub use task::{Task, TaskFuture};
