//! Built-in administrative tasks.
//!
//! Every task is deferred: nothing touches the store until the runner
//! drives it. Tasks that change data are audited.

use opsctl_core::{AuditEntry, AuditFilter, Problem, Record, RecordFilter};
use opsctl_harness::{audited, Console, ContainerHandle, Lifecycle, Task};
use opsctl_services::{IntegrityReport, RepairSummary};
use opsctl_storage::StorageOpener;
use serde::Serialize;
use serde_json::json;

/// Load one record.
pub fn get<O: StorageOpener>(
    lifecycle: &Lifecycle<O>,
    collection: String,
    key: String,
) -> Task<'_, Record> {
    let get = lifecycle.bind(|c: ContainerHandle, (collection, key): (String, String)| async move {
        c.records().require(&collection, &key).await
    });
    get(None, (collection, key))
}

/// List records, optionally from one collection.
pub fn list<O: StorageOpener>(lifecycle: &Lifecycle<O>, filter: RecordFilter) -> Task<'_, Vec<Record>> {
    let list = lifecycle.bind(|c: ContainerHandle, filter: RecordFilter| async move {
        c.records().list(&filter).await
    });
    list(None, filter)
}

/// Create or replace a record from a JSON document.
pub fn put<'a, O: StorageOpener>(
    lifecycle: &'a Lifecycle<O>,
    console: &'a Console,
    collection: String,
    key: String,
    raw: String,
) -> Task<'a, Record> {
    Task::deferred(move || {
        lifecycle.scoped(None, move |c| async move {
            let work = Task::in_flight(async {
                let data = parse_document(&raw)?;
                c.records().put(&collection, &key, data).await
            });
            audited(c.audit(), console, "record.put", work).await
        })
    })
}

/// Delete a record.
pub fn delete<'a, O: StorageOpener>(
    lifecycle: &'a Lifecycle<O>,
    console: &'a Console,
    collection: String,
    key: String,
) -> Task<'a, Record> {
    Task::deferred(move || {
        lifecycle.scoped(None, move |c| async move {
            let work = Task::in_flight(async { c.records().delete(&collection, &key).await });
            audited(c.audit(), console, "record.delete", work).await
        })
    })
}

/// Check record checksums. Joins `active` when given.
pub fn verify<O: StorageOpener>(
    lifecycle: &Lifecycle<O>,
    active: Option<ContainerHandle>,
    filter: RecordFilter,
) -> Task<'_, IntegrityReport> {
    let verify = lifecycle.bind(|c: ContainerHandle, filter: RecordFilter| async move {
        c.records().verify(&filter).await
    });
    verify(active, filter)
}

/// Verify, then fix every mismatch, on one container.
pub fn repair<'a, O: StorageOpener>(
    lifecycle: &'a Lifecycle<O>,
    console: &'a Console,
    filter: RecordFilter,
) -> Task<'a, RepairSummary> {
    Task::deferred(move || {
        lifecycle.scoped(None, move |c| async move {
            let report = verify(lifecycle, Some(c.clone()), filter).await?;
            if report.is_clean() {
                return Ok(RepairSummary::default());
            }
            let work = Task::in_flight(async { c.records().repair(&report).await });
            audited(c.audit(), console, "record.repair", work).await
        })
    })
}

/// A freshly issued token. Only its digest is stored.
#[derive(Debug, Serialize)]
pub struct IssuedToken {
    /// Label the digest is stored under
    pub label: String,
    /// The token itself, shown once
    pub token: String,
    /// Version of the stored digest record
    pub version: u64,
}

/// Issue a random token and store its digest under `tokens/<label>`.
pub fn issue_token<'a, O: StorageOpener>(
    lifecycle: &'a Lifecycle<O>,
    console: &'a Console,
    label: String,
    bytes: usize,
) -> Task<'a, IssuedToken> {
    Task::deferred(move || {
        lifecycle.scoped(None, move |c| async move {
            let token = c.crypto().token(bytes);
            let digest = c.crypto().digest(token.as_bytes());
            let work = Task::in_flight(async {
                c.records().put("tokens", &label, json!({ "sha256": digest })).await
            });
            let record = audited(c.audit(), console, "token.issue", work).await?;
            Ok(IssuedToken {
                label,
                token,
                version: record.version,
            })
        })
    })
}

/// Read the audit trail.
pub fn audit_trail<O: StorageOpener>(
    lifecycle: &Lifecycle<O>,
    filter: AuditFilter,
) -> Task<'_, Vec<AuditEntry>> {
    let trail = lifecycle.bind(|c: ContainerHandle, filter: AuditFilter| async move {
        c.audit().list(&filter).await.map_err(anyhow::Error::from)
    });
    trail(None, filter)
}

fn parse_document(raw: &str) -> anyhow::Result<serde_json::Value> {
    serde_json::from_str(raw).map_err(|err| {
        Problem::bad_request("Invalid input")
            .with_detail(json!({ "error": err.to_string() }))
            .into()
    })
}
