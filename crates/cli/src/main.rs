//! opsctl - run administrative tasks against the application store.

mod tasks;

use clap::{Parser, Subcommand};
use opsctl_core::{AuditFilter, RecordFilter};
use opsctl_harness::{Console, Lifecycle, RunStatus, Runner};
use opsctl_storage::{Backend, StoreConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "opsctl")]
#[command(about = "Run administrative tasks against the application store", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Store location: a directory (json) or a database file (sqlite)
    #[arg(long, env = "OPSCTL_STORE", default_value = ".opsctl", global = true)]
    store: PathBuf,

    /// Storage backend (json, sqlite)
    #[arg(long, env = "OPSCTL_BACKEND", default_value = "json", global = true)]
    backend: Backend,

    /// Log filter, e.g. `info` or `opsctl_harness=debug` (defaults to RUST_LOG, then `warn`)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show one record
    Get {
        /// Collection name
        collection: String,
        /// Record key
        key: String,
    },
    /// List records
    List {
        /// Only this collection
        collection: Option<String>,
        /// Maximum number of records
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Create or replace a record
    Put {
        /// Collection name
        collection: String,
        /// Record key
        key: String,
        /// JSON document
        data: String,
    },
    /// Delete a record
    Delete {
        /// Collection name
        collection: String,
        /// Record key
        key: String,
    },
    /// Check record checksums
    Verify {
        /// Only this collection
        collection: Option<String>,
    },
    /// Fix records whose checksum does not match
    Repair {
        /// Only this collection
        collection: Option<String>,
    },
    /// Issue a random token and store its digest
    Token {
        /// Label to store the digest under
        label: String,
        /// Random bytes in the token
        #[arg(long, default_value = "32")]
        bytes: usize,
    },
    /// Show the audit trail
    Audit {
        /// Only this action
        #[arg(long)]
        action: Option<String>,
        /// Only failed entries
        #[arg(long)]
        failed: bool,
        /// Most recent entries to show
        #[arg(long, default_value = "50")]
        limit: usize,
    },
}

fn init_logging(level: Option<&str>) {
    // stdout carries the task result; logs go to stderr.
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let lifecycle = Lifecycle::new(StoreConfig {
        backend: cli.backend,
        location: cli.store,
    });
    let runner = Runner::new(Arc::new(Console::stdio()));

    let status = run(cli.command, &lifecycle, &runner).await;
    debug!(?status, "exiting");
    status.into()
}

async fn run(command: Commands, lifecycle: &Lifecycle<StoreConfig>, runner: &Runner) -> RunStatus {
    let console = runner.console();
    match command {
        Commands::Get { collection, key } => {
            runner.run(tasks::get(lifecycle, collection, key)).await
        }
        Commands::List { collection, limit } => {
            let filter = RecordFilter { collection, limit };
            runner.run(tasks::list(lifecycle, filter)).await
        }
        Commands::Put { collection, key, data } => {
            runner.run(tasks::put(lifecycle, console, collection, key, data)).await
        }
        Commands::Delete { collection, key } => {
            runner.run(tasks::delete(lifecycle, console, collection, key)).await
        }
        Commands::Verify { collection } => {
            let filter = RecordFilter { collection, limit: None };
            runner.run(tasks::verify(lifecycle, None, filter)).await
        }
        Commands::Repair { collection } => {
            let filter = RecordFilter { collection, limit: None };
            runner.run(tasks::repair(lifecycle, console, filter)).await
        }
        Commands::Token { label, bytes } => {
            runner.run(tasks::issue_token(lifecycle, console, label, bytes)).await
        }
        Commands::Audit { action, failed, limit } => {
            let filter = AuditFilter {
                action,
                success: failed.then_some(false),
                limit: Some(limit),
            };
            runner.run(tasks::audit_trail(lifecycle, filter)).await
        }
    }
}
