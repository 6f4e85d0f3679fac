//! Request and response interceptors.
//!
//! An [`Interceptor`] pairs an on-fulfilled handler with an optional
//! on-rejected handler. Handlers may be plain closures or async closures;
//! both are stored as boxed futures so the pipeline awaits them uniformly.
//!
//! Interceptors live in an [`InterceptorManager`], one per direction. Removal
//! leaves an empty slot behind so issued [`InterceptorId`]s stay unambiguous
//! and the surviving entries keep their order.
//!
//! ```ignore
//! use courier_client::{Client, HttpError, Interceptor};
//!
//! let client = Client::new()?;
//! let id = client.interceptors().request.register(Interceptor::new(|config| {
//!     Ok(config.header("Authorization", "Bearer token"))
//! }));
//! client.interceptors().request.unregister(id);
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use futures::FutureExt;
use futures::future;

use crate::config::RequestConfig;
use crate::error::HttpError;
use crate::response::Response;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type Fulfilled<T> = Arc<dyn Fn(T) -> BoxFuture<'static, Result<T, HttpError>> + Send + Sync>;
type Rejected<T> = Arc<dyn Fn(HttpError) -> BoxFuture<'static, Result<T, HttpError>> + Send + Sync>;

// ============================================================================
// Interceptor
// ============================================================================

/// A pair of handlers run as one stage of the request pipeline.
pub struct Interceptor<T> {
    fulfilled: Fulfilled<T>,
    rejected: Option<Rejected<T>>,
}

impl<T: Send + 'static> Interceptor<T> {
    /// An interceptor with a synchronous on-fulfilled handler.
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(T) -> Result<T, HttpError> + Send + Sync + 'static,
    {
        Self {
            fulfilled: Arc::new(move |value| future::ready(handler(value)).boxed()),
            rejected: None,
        }
    }

    /// An interceptor with an asynchronous on-fulfilled handler.
    pub fn from_async<F, Fut>(handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, HttpError>> + Send + 'static,
    {
        Self {
            fulfilled: Arc::new(move |value| handler(value).boxed()),
            rejected: None,
        }
    }

    /// Pass values through untouched; useful with an on-rejected handler only.
    pub fn identity() -> Self {
        Self::new(Ok)
    }

    /// Attach a synchronous on-rejected handler.
    ///
    /// Returning `Ok` recovers the pipeline; returning `Err` keeps it failed.
    pub fn on_rejected<F>(mut self, handler: F) -> Self
    where
        F: Fn(HttpError) -> Result<T, HttpError> + Send + Sync + 'static,
    {
        self.rejected = Some(Arc::new(move |error| future::ready(handler(error)).boxed()));
        self
    }

    /// Attach an asynchronous on-rejected handler.
    pub fn on_rejected_async<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(HttpError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, HttpError>> + Send + 'static,
    {
        self.rejected = Some(Arc::new(move |error| handler(error).boxed()));
        self
    }

    pub fn has_rejected(&self) -> bool {
        self.rejected.is_some()
    }

    /// Advance the pipeline from `outcome`.
    ///
    /// A failure without an on-rejected handler passes through untouched.
    pub(crate) async fn run(&self, outcome: Result<T, HttpError>) -> Result<T, HttpError> {
        match outcome {
            Ok(value) => (self.fulfilled)(value).await,
            Err(error) => match &self.rejected {
                Some(rejected) => rejected(error).await,
                None => Err(error),
            },
        }
    }
}

impl<T> Clone for Interceptor<T> {
    fn clone(&self) -> Self {
        Self {
            fulfilled: Arc::clone(&self.fulfilled),
            rejected: self.rejected.clone(),
        }
    }
}

impl<T> fmt::Debug for Interceptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("rejected", &self.rejected.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Identity of a registered interceptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterceptorId(usize);

impl InterceptorId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Ordered registry of interceptors with tombstoned removal.
///
/// Reads may run concurrently; registration and removal are serialized.
pub struct InterceptorManager<T> {
    slots: RwLock<Vec<Option<Interceptor<T>>>>,
}

impl<T> Default for InterceptorManager<T> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Send + 'static> InterceptorManager<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `interceptor`; ids grow monotonically and are never reused.
    pub fn register(&self, interceptor: Interceptor<T>) -> InterceptorId {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.push(Some(interceptor));
        InterceptorId(slots.len() - 1)
    }

    /// Empty the slot for `id`. Unknown or already removed ids are ignored.
    pub fn unregister(&self, id: InterceptorId) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.get_mut(id.0) {
            *slot = None;
        }
    }

    /// Visit live interceptors in registration order.
    pub fn for_each_active<F>(&self, mut visit: F)
    where
        F: FnMut(InterceptorId, &Interceptor<T>),
    {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        for (index, slot) in slots.iter().enumerate() {
            if let Some(interceptor) = slot {
                visit(InterceptorId(index), interceptor);
            }
        }
    }

    /// Clone out the live interceptors so no lock is held while they run.
    pub fn snapshot(&self) -> Vec<Interceptor<T>> {
        let mut active = Vec::new();
        self.for_each_active(|_, interceptor| active.push(interceptor.clone()));
        active
    }

    pub fn active_count(&self) -> usize {
        let mut count = 0;
        self.for_each_active(|_, _| count += 1);
        count
    }
}

impl<T> fmt::Debug for InterceptorManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("InterceptorManager")
            .field("slots", &slots.len())
            .field("active", &slots.iter().filter(|slot| slot.is_some()).count())
            .finish()
    }
}

/// The two registries a client owns.
#[derive(Debug, Default)]
pub struct Interceptors {
    /// Run in registration order before dispatch.
    pub request: InterceptorManager<RequestConfig>,
    /// Run in registration order after dispatch.
    pub response: InterceptorManager<Response>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tagger(tag: &'static str) -> Interceptor<Vec<&'static str>> {
        Interceptor::new(move |mut seen: Vec<&'static str>| {
            seen.push(tag);
            Ok(seen)
        })
    }

    async fn run_all(manager: &InterceptorManager<Vec<&'static str>>) -> Vec<&'static str> {
        let mut outcome = Ok(Vec::new());
        for interceptor in manager.snapshot() {
            outcome = interceptor.run(outcome).await;
        }
        outcome.unwrap()
    }

    #[test]
    fn test_ids_are_monotonic() {
        let manager = InterceptorManager::new();
        let a = manager.register(tagger("a"));
        let b = manager.register(tagger("b"));
        manager.unregister(a);
        let c = manager.register(tagger("c"));
        assert!(a < b && b < c);
        assert_eq!(c.index(), 2);
    }

    #[tokio::test]
    async fn test_unregister_preserves_order() {
        let manager = InterceptorManager::new();
        let _a = manager.register(tagger("a"));
        let b = manager.register(tagger("b"));
        let _c = manager.register(tagger("c"));

        manager.unregister(b);
        assert_eq!(run_all(&manager).await, ["a", "c"]);
        assert_eq!(manager.active_count(), 2);
    }

    #[tokio::test]
    async fn test_unregister_twice_and_unknown_are_noops() {
        let manager = InterceptorManager::new();
        let a = manager.register(tagger("a"));
        let _b = manager.register(tagger("b"));

        manager.unregister(a);
        manager.unregister(a);
        manager.unregister(InterceptorId(42));
        assert_eq!(run_all(&manager).await, ["b"]);
    }

    #[test]
    fn test_for_each_active_reports_ids() {
        let manager = InterceptorManager::new();
        let a = manager.register(tagger("a"));
        let b = manager.register(tagger("b"));
        manager.unregister(a);

        let mut ids = Vec::new();
        manager.for_each_active(|id, _| ids.push(id));
        assert_eq!(ids, [b]);
    }

    #[tokio::test]
    async fn test_async_handler() {
        let manager = InterceptorManager::new();
        manager.register(tagger("sync"));
        manager.register(Interceptor::from_async(|mut seen: Vec<&'static str>| async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            seen.push("async");
            Ok(seen)
        }));
        manager.register(tagger("after"));
        assert_eq!(run_all(&manager).await, ["sync", "async", "after"]);
    }

    #[tokio::test]
    async fn test_failure_skips_fulfilled_handlers() {
        let failing = Interceptor::new(|_: u32| Err(HttpError::transform("nope")));
        let skipped = Interceptor::new(|n: u32| Ok(n + 1));

        let outcome = failing.run(Ok(1)).await;
        let outcome = skipped.run(outcome).await;
        assert_eq!(outcome.unwrap_err().message(), "nope");
    }

    #[tokio::test]
    async fn test_rejected_handler_recovers() {
        let recover = Interceptor::identity().on_rejected(|_| Ok(7u32));
        assert!(recover.has_rejected());
        let outcome = recover.run(Err(HttpError::transform("nope"))).await;
        assert_eq!(outcome.unwrap(), 7);

        let recover_async = Interceptor::identity()
            .on_rejected_async(|error: HttpError| async move { Ok(error.message().len()) });
        let outcome = recover_async.run(Err(HttpError::transform("four"))).await;
        assert_eq!(outcome.unwrap(), 4);
    }
}
