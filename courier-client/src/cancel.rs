//! Cooperative cancellation.
//!
//! A [`CancelToken`] is a one-shot latch created together with its
//! [`Canceler`]. The first call to [`Canceler::cancel`] records a [`Cancel`]
//! reason and notifies every observer exactly once; later calls do nothing.
//!
//! ```ignore
//! use courier_client::{CancelToken, RequestConfig};
//!
//! let source = CancelToken::source();
//! let config = RequestConfig::new().cancel_token(source.token.clone());
//! // elsewhere
//! source.cancel.cancel("Operation canceled by the user.");
//! ```

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::error::HttpError;

/// The reason a request was cancelled.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cancel {
    message: Option<String>,
}

impl Cancel {
    /// A reason carrying `message`.
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// The message given to the canceler, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl fmt::Display for Cancel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => f.write_str(message),
            None => f.write_str("request cancelled"),
        }
    }
}

impl std::error::Error for Cancel {}

type Observer = Box<dyn FnOnce(&Cancel) + Send>;

#[derive(Default)]
struct State {
    reason: Option<Cancel>,
    next_key: u64,
    observers: Vec<(u64, Observer)>,
}

impl State {
    fn forget(&mut self, key: u64) {
        self.observers.retain(|(k, _)| *k != key);
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The read side of a cancellation latch.
///
/// Cloning is cheap; every clone observes the same latch.
#[derive(Clone)]
pub struct CancelToken {
    state: Arc<Mutex<State>>,
}

/// The write side of a cancellation latch.
#[derive(Clone)]
pub struct Canceler {
    state: Arc<Mutex<State>>,
}

/// A token paired with its canceler, as returned by [`CancelToken::source`].
#[derive(Clone, Debug)]
pub struct CancelTokenSource {
    pub token: CancelToken,
    pub cancel: Canceler,
}

impl CancelToken {
    /// Create a token, handing its canceler to `executor` synchronously.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Canceler),
    {
        let state = Arc::new(Mutex::new(State::default()));
        executor(Canceler {
            state: Arc::clone(&state),
        });
        Self { state }
    }

    /// A fresh token and canceler in one call.
    pub fn source() -> CancelTokenSource {
        let state = Arc::new(Mutex::new(State::default()));
        CancelTokenSource {
            token: CancelToken {
                state: Arc::clone(&state),
            },
            cancel: Canceler { state },
        }
    }

    /// The recorded reason, once cancelled.
    pub fn reason(&self) -> Option<Cancel> {
        lock(&self.state).reason.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        lock(&self.state).reason.is_some()
    }

    /// `Err(reason)` if the token has already fired.
    pub fn throw_if_requested(&self) -> Result<(), Cancel> {
        match self.reason() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Register `observer`; it runs at most once.
    ///
    /// If the token has already fired, `observer` runs immediately on the
    /// calling thread.
    pub fn on_cancelled<F>(&self, observer: F)
    where
        F: FnOnce(&Cancel) + Send + 'static,
    {
        self.register(Box::new(observer));
    }

    /// Store `observer` under a fresh key, or run it now if already fired.
    fn register(&self, observer: Observer) -> Option<u64> {
        let mut state = lock(&self.state);
        match state.reason.clone() {
            Some(reason) => {
                drop(state);
                observer(&reason);
                None
            }
            None => {
                let key = state.next_key;
                state.next_key += 1;
                state.observers.push((key, observer));
                Some(key)
            }
        }
    }

    /// Wait until the token fires and yield its reason.
    ///
    /// Never completes for a token that is never cancelled. Dropping the
    /// future before then removes its observer from the token.
    pub async fn cancelled(&self) -> Cancel {
        let (tx, rx) = oneshot::channel();
        let _registration = Registration {
            state: &self.state,
            key: self.register(Box::new(move |reason| {
                let _ = tx.send(reason.clone());
            })),
        };
        match rx.await {
            Ok(reason) => reason,
            Err(_) => std::future::pending().await,
        }
    }

    #[cfg(test)]
    pub(crate) fn observer_count(&self) -> usize {
        lock(&self.state).observers.len()
    }
}

/// Removes a [`CancelToken::cancelled`] observer when the waiter goes away.
struct Registration<'a> {
    state: &'a Mutex<State>,
    key: Option<u64>,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key {
            lock(self.state).forget(key);
        }
    }
}

impl Canceler {
    /// Fire the token with `message`. Only the first call has any effect.
    pub fn cancel<S: Into<String>>(&self, message: S) {
        self.fire(Cancel::new(message));
    }

    /// Fire the token without a message.
    pub fn cancel_silently(&self) {
        self.fire(Cancel::default());
    }

    fn fire(&self, reason: Cancel) {
        let observers = {
            let mut state = lock(&self.state);
            if state.reason.is_some() {
                return;
            }
            state.reason = Some(reason.clone());
            std::mem::take(&mut state.observers)
        };
        // Observers run outside the lock so they may inspect the token.
        for (_, observer) in observers {
            observer(&reason);
        }
    }
}

impl fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("CancelToken")
            .field("reason", &state.reason)
            .field("observers", &state.observers.len())
            .finish()
    }
}

impl fmt::Debug for Canceler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canceler").finish_non_exhaustive()
    }
}

/// Whether `error` is a cancellation rather than a transport or status failure.
pub fn is_cancel(error: &HttpError) -> bool {
    error.is_cancel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_executor_runs_synchronously() {
        let mut captured = None;
        let token = CancelToken::new(|cancel| captured = Some(cancel));
        assert!(!token.is_cancelled());

        captured.unwrap().cancel("now");
        assert_eq!(token.reason(), Some(Cancel::new("now")));
    }

    #[test]
    fn test_cancel_twice_keeps_first_reason() {
        let source = CancelToken::source();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        source.token.on_cancelled(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        source.cancel.cancel("first");
        source.cancel.cancel("second");

        assert_eq!(source.token.reason().unwrap().message(), Some("first"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_every_observer_fires_once() {
        let source = CancelToken::source();
        let fired = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let counter = Arc::clone(&fired);
            source.token.on_cancelled(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        source.cancel.clone().cancel("stop");
        source.cancel.cancel("stop again");
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_late_observer_fires_immediately() {
        let source = CancelToken::source();
        source.cancel.cancel("done");

        let seen = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&seen);
        source.token.on_cancelled(move |reason| {
            *slot.lock().unwrap() = reason.message().map(str::to_string);
        });
        assert_eq!(seen.lock().unwrap().as_deref(), Some("done"));
    }

    #[test]
    fn test_throw_if_requested() {
        let source = CancelToken::source();
        assert!(source.token.throw_if_requested().is_ok());
        source.cancel.cancel_silently();
        let reason = source.token.throw_if_requested().unwrap_err();
        assert_eq!(reason.message(), None);
        assert_eq!(reason.to_string(), "request cancelled");
    }

    #[tokio::test]
    async fn test_cancelled_future_resolves() {
        let source = CancelToken::source();
        let token = source.token.clone();
        let waiter = tokio::spawn(async move { token.cancelled().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        source.cancel.cancel("stopped");

        let reason = waiter.await.unwrap();
        assert_eq!(reason.message(), Some("stopped"));
    }

    #[tokio::test]
    async fn test_cancelled_future_pending_until_fired() {
        let source = CancelToken::source();
        let waited =
            tokio::time::timeout(Duration::from_millis(20), source.token.cancelled()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_dropped_waiters_leave_no_observers() {
        let source = CancelToken::source();
        for _ in 0..100 {
            let waited =
                tokio::time::timeout(Duration::from_millis(1), source.token.cancelled()).await;
            assert!(waited.is_err());
        }
        assert_eq!(source.token.observer_count(), 0);

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        source.token.on_cancelled(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(source.token.observer_count(), 1);
        source.cancel.cancel("later");
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(source.token.observer_count(), 0);
    }

    #[test]
    fn test_is_cancel() {
        assert!(is_cancel(&HttpError::Cancelled(Cancel::new("x"))));
        assert!(!is_cancel(&HttpError::transform("x")));
    }
}
