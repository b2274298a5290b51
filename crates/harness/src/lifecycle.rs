//! Container lifecycle - create once per task chain, tear down once.
//!
//! A chain of dependent steps shares one [`Container`]. The step that
//! creates it is the owner and is the only one that releases it; every
//! other step borrows the handle it was passed. Handles travel explicitly
//! down the chain, so nothing here is process-global.

use crate::error::HarnessError;
use crate::task::Task;
use opsctl_services::{AuditLog, Container, Crypto, RecordService};
use opsctl_storage::StorageOpener;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error};

/// A shared reference to the container of the current chain.
///
/// Cloning a handle never creates or releases anything.
#[derive(Clone, Debug)]
pub struct ContainerHandle(Arc<Container>);

impl ContainerHandle {
    /// Record service
    pub fn records(&self) -> &RecordService {
        &self.0.records
    }

    /// Audit log
    pub fn audit(&self) -> &AuditLog {
        &self.0.audit
    }

    /// Crypto helper
    pub fn crypto(&self) -> &Crypto {
        &self.0.crypto
    }

    /// Whether the container has been torn down.
    pub fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    /// Whether two handles point at the same container.
    pub fn same_container(&self, other: &ContainerHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn release(&self) {
        let closed = std::panic::catch_unwind(AssertUnwindSafe(|| self.0.close()));
        match closed {
            Ok(()) => debug!("released container"),
            Err(_) => error!("container close panicked; continuing with the task outcome"),
        }
    }
}

/// Who is responsible for tearing a container down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// This step created the container and must release it.
    Owner,
    /// The container came from an earlier step.
    Borrowed,
}

/// Creates containers on demand and scopes their lifetime to a chain.
pub struct Lifecycle<O> {
    opener: O,
    crypto: Crypto,
}

impl<O: StorageOpener> Lifecycle<O> {
    /// Create a lifecycle manager that opens stores with `opener`.
    pub fn new(opener: O) -> Self {
        Self {
            opener,
            crypto: Crypto::new(),
        }
    }

    /// Reuse the active container, or build a new one and become its owner.
    ///
    /// A store that fails to open leaves nothing behind.
    pub async fn acquire(
        &self,
        active: Option<&ContainerHandle>,
    ) -> Result<(ContainerHandle, Ownership), HarnessError> {
        if let Some(handle) = active {
            return Ok((handle.clone(), Ownership::Borrowed));
        }

        let store = self.opener.open().await.map_err(HarnessError::Open)?;
        let container = Container::assemble(store, self.crypto.clone());
        debug!("created container");
        Ok((ContainerHandle(Arc::new(container)), Ownership::Owner))
    }

    /// Run `op` against the active container, or a new one.
    ///
    /// When this call created the container it releases it after `op`
    /// settles, on both branches, and returns `op`'s outcome unchanged.
    pub async fn scoped<T, F, Fut>(
        &self,
        active: Option<&ContainerHandle>,
        op: F,
    ) -> anyhow::Result<T>
    where
        F: FnOnce(ContainerHandle) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let (handle, ownership) = self.acquire(active).await?;
        match ownership {
            Ownership::Borrowed => op(handle).await,
            Ownership::Owner => {
                let owned = handle.clone();
                let outcome = op(handle).await;
                owned.release();
                outcome
            }
        }
    }

    /// Turn a task definition into a task factory with the same arguments.
    ///
    /// Each produced task is deferred: the container is only acquired when
    /// the task is driven. Pass `Some(handle)` to join an existing chain.
    pub fn bind<'a, A, T, F, Fut>(
        &'a self,
        definition: F,
    ) -> impl Fn(Option<ContainerHandle>, A) -> Task<'a, T> + 'a
    where
        A: Send + 'a,
        T: Send + 'a,
        F: Fn(ContainerHandle, A) -> Fut + Send + Sync + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        let definition = Arc::new(definition);
        move |active: Option<ContainerHandle>, args: A| {
            let definition = definition.clone();
            Task::deferred(move || async move {
                self.scoped(active.as_ref(), move |container| definition(container, args))
                    .await
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{CountingOpener, FailingOpener};
    use opsctl_core::Problem;
    use opsctl_storage::{Backend, StoreConfig};
    use serde_json::json;

    #[tokio::test]
    async fn chain_shares_one_container_and_releases_it_once() {
        let (opener, stats) = CountingOpener::new();
        let lifecycle = Lifecycle::new(opener);

        let seen = lifecycle
            .scoped(None, |outer| {
                let lifecycle = &lifecycle;
                let stats = &stats;
                async move {
                    let mut seen = vec![outer.clone()];
                    for step in 0..5 {
                        let handle = lifecycle
                            .scoped(Some(&outer), |inner| async move {
                                inner.records().put("steps", &format!("s{step}"), json!(step)).await?;
                                Ok::<_, anyhow::Error>(inner)
                            })
                            .await?;
                        assert!(!handle.is_closed());
                        seen.push(handle);
                    }
                    assert_eq!(stats.closes(), 0);
                    Ok::<_, anyhow::Error>(seen)
                }
            })
            .await
            .unwrap();

        assert_eq!(stats.opens(), 1);
        assert_eq!(stats.closes(), 1);
        assert!(seen.iter().all(|h| h.same_container(&seen[0])));
        assert!(seen[0].is_closed());
    }

    #[tokio::test]
    async fn failing_step_still_releases_and_keeps_error() {
        let (opener, stats) = CountingOpener::new();
        let lifecycle = Lifecycle::new(opener);

        let err = lifecycle
            .scoped(None, |outer| {
                let lifecycle = &lifecycle;
                async move {
                    lifecycle
                        .scoped(Some(&outer), |_inner| async {
                            Err::<(), anyhow::Error>(Problem::conflict("stale").into())
                        })
                        .await
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.downcast_ref::<Problem>().unwrap().status, 409);
        assert_eq!(stats.opens(), 1);
        assert_eq!(stats.closes(), 1);
    }

    #[tokio::test]
    async fn open_failure_propagates_without_running_the_step() {
        let lifecycle = Lifecycle::new(FailingOpener);
        let mut ran = false;

        let err = lifecycle
            .scoped(None, |_container| {
                ran = true;
                async { Ok(()) }
            })
            .await
            .unwrap_err();

        assert!(!ran);
        assert!(matches!(
            err.downcast_ref::<HarnessError>(),
            Some(HarnessError::Open(_))
        ));
    }

    #[tokio::test]
    async fn sequential_invocations_get_their_own_containers() {
        let (opener, stats) = CountingOpener::new();
        let lifecycle = Lifecycle::new(opener);

        let first = lifecycle.scoped(None, |c| async move { Ok(c) }).await.unwrap();
        assert_eq!((stats.opens(), stats.closes()), (1, 1));

        let second = lifecycle.scoped(None, |c| async move { Ok(c) }).await.unwrap();
        assert_eq!((stats.opens(), stats.closes()), (2, 2));

        assert!(!first.same_container(&second));
        assert!(first.is_closed() && second.is_closed());
    }

    #[tokio::test]
    async fn json_store_is_closed_after_the_owner_settles() {
        let dir = tempfile::tempdir().unwrap();
        let lifecycle = Lifecycle::new(StoreConfig {
            backend: Backend::Json,
            location: dir.path().join("store"),
        });

        let first = lifecycle
            .scoped(None, |c| async move {
                c.records().put("users", "bob", json!({"age": 42})).await?;
                Ok::<_, anyhow::Error>(c)
            })
            .await
            .unwrap();
        assert!(first.is_closed());
        assert!(first.records().get("users", "bob").await.is_err());

        let record = lifecycle
            .scoped(None, |c| async move { c.records().require("users", "bob").await })
            .await
            .unwrap();
        assert_eq!(record.data["age"], 42);
        assert!(dir.path().join("store/records/users/bob.json").exists());
    }

    #[tokio::test]
    async fn panicking_close_does_not_replace_the_outcome() {
        let (opener, stats) = CountingOpener::panicking_on_close();
        let lifecycle = Lifecycle::new(opener);

        let value = lifecycle.scoped(None, |_c| async { Ok(5) }).await.unwrap();

        assert_eq!(value, 5);
        assert_eq!(stats.closes(), 1);
    }

    #[tokio::test]
    async fn bound_definitions_keep_their_arguments() {
        let (opener, stats) = CountingOpener::new();
        let lifecycle = Lifecycle::new(opener);

        let put = lifecycle.bind(|c: ContainerHandle, (key, age): (String, u32)| async move {
            c.records().put("users", &key, json!({"age": age})).await
        });

        let task = put(None, ("bob".to_string(), 42));
        assert_eq!(stats.opens(), 0);

        let record = task.await.unwrap();
        assert_eq!(record.data["age"], 42);
        assert_eq!((stats.opens(), stats.closes()), (1, 1));
    }

    #[tokio::test]
    async fn bound_definitions_join_an_active_chain() {
        let (opener, stats) = CountingOpener::new();
        let lifecycle = Lifecycle::new(opener);
        let get = lifecycle.bind(|c: ContainerHandle, key: &'static str| async move {
            c.records().require("users", key).await
        });

        let record = lifecycle
            .scoped(None, |c| async move {
                c.records().put("users", "bob", json!({})).await?;
                get(Some(c.clone()), "bob").await
            })
            .await
            .unwrap();

        assert_eq!(record.key, "bob");
        assert_eq!((stats.opens(), stats.closes()), (1, 1));
    }
}
