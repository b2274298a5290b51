//! Task runner - drives a task and turns its outcome into process output.

use crate::classify::to_printable;
use crate::console::Console;
use crate::task::Task;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Terminal state of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The result was printed on the output stream.
    Succeeded,
    /// A diagnostic was printed on the error stream.
    Failed,
}

impl RunStatus {
    /// Process exit status for this state.
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Succeeded => 0,
            RunStatus::Failed => 1,
        }
    }
}

impl From<RunStatus> for std::process::ExitCode {
    fn from(status: RunStatus) -> Self {
        std::process::ExitCode::from(status.exit_code())
    }
}

/// Runs tasks against a console.
#[derive(Debug, Clone)]
pub struct Runner {
    console: Arc<Console>,
}

impl Runner {
    /// Create a runner writing to `console`.
    pub fn new(console: Arc<Console>) -> Self {
        Self { console }
    }

    /// The console results and diagnostics go to.
    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Drive `task` to completion.
    ///
    /// A value is serialized and printed as one line of JSON. An error, or
    /// a value that cannot be serialized, is reported as a diagnostic and
    /// yields [`RunStatus::Failed`].
    pub async fn run<'a, T: Serialize + 'a>(&self, task: Task<'a, T>) -> RunStatus {
        debug!(?task, "running task");
        let printable = match task.await {
            Ok(value) => to_printable(&value).map_err(anyhow::Error::from),
            Err(err) => Err(err),
        };

        match printable {
            Ok(value) => {
                self.console.line(&value.to_string());
                info!("task succeeded");
                RunStatus::Succeeded
            }
            Err(err) => {
                self.console.report(&err);
                info!("task failed");
                RunStatus::Failed
            }
        }
    }
}
