//! Tasks - single-shot units of asynchronous work.

use futures::future::{BoxFuture, FutureExt};
use std::future::{Future, IntoFuture};

/// The future a task resolves to.
pub type TaskFuture<'a, T> = BoxFuture<'a, anyhow::Result<T>>;

/// A unit of work that settles once with a value or an error.
///
/// Every entry point that accepts a task resolves it with
/// [`Task::resolve`], so callers may hand over either form.
pub enum Task<'a, T> {
    /// A producer that creates the work when the task is driven.
    Deferred(Box<dyn FnOnce() -> TaskFuture<'a, T> + Send + 'a>),
    /// Work that already exists.
    InFlight(TaskFuture<'a, T>),
}

impl<'a, T: 'a> Task<'a, T> {
    /// Wrap a producer. Nothing runs until the task is driven.
    pub fn deferred<F, Fut>(producer: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        Task::Deferred(Box::new(move || producer().boxed()))
    }

    /// Wrap an existing future.
    pub fn in_flight<Fut>(future: Fut) -> Self
    where
        Fut: Future<Output = anyhow::Result<T>> + Send + 'a,
    {
        Task::InFlight(future.boxed())
    }

    /// Resolve either form to a future.
    pub fn resolve(self) -> TaskFuture<'a, T> {
        match self {
            Task::Deferred(producer) => producer(),
            Task::InFlight(future) => future,
        }
    }
}

impl<'a, T: 'a> IntoFuture for Task<'a, T> {
    type Output = anyhow::Result<T>;
    type IntoFuture = TaskFuture<'a, T>;

    fn into_future(self) -> Self::IntoFuture {
        self.resolve()
    }
}

impl<T> std::fmt::Debug for Task<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::Deferred(_) => f.write_str("Task::Deferred"),
            Task::InFlight(_) => f.write_str("Task::InFlight"),
        }
    }
}
