//! The service container a task runs against.

use crate::audit::AuditLog;
use crate::crypto::Crypto;
use crate::records::RecordService;
use opsctl_storage::Storage;
use std::sync::Arc;

/// Domain services bound to one open store.
///
/// The container owns the store handle; every service holds a reference to
/// the same handle, so closing the container closes it for all of them.
pub struct Container {
    /// Record reads, writes and integrity checks
    pub records: RecordService,

    /// Audit trail
    pub audit: AuditLog,

    /// Checksums and tokens
    pub crypto: Crypto,

    store: Arc<dyn Storage>,
}

impl Container {
    /// Bind the domain services to `store`. Performs no I/O.
    pub fn assemble(store: Arc<dyn Storage>, crypto: Crypto) -> Self {
        Self {
            records: RecordService::new(store.clone(), crypto.clone()),
            audit: AuditLog::new(store.clone()),
            crypto,
            store,
        }
    }

    /// The underlying store handle.
    pub fn store(&self) -> &Arc<dyn Storage> {
        &self.store
    }

    /// Release the store handle.
    pub fn close(&self) {
        self.store.close();
    }

    /// Whether the store handle has been released.
    pub fn is_closed(&self) -> bool {
        self.store.is_closed()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
