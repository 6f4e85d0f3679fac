//! The wire transport seam.
//!
//! The dispatcher hands a finalized [`TransportRequest`] to a [`Transport`]
//! and gets back an [`Exchange`]: a future for the outcome plus an optional
//! abort hook the dispatcher runs when the request is cancelled in flight.
//!
//! [`HyperTransport`] is the production implementation on top of
//! hyper_util's legacy client. It supports:
//!
//! - HTTP/1.1 and HTTP/2 with automatic protocol negotiation
//! - TLS with rustls (feature-gated)
//! - Per-request timeouts and abort
//!
//! # Feature Flags
//!
//! - `tls` (default) - Enables `tls-ring` + `tls-native-roots` for convenience
//! - `tls-ring` / `tls-aws-lc` - Crypto providers
//! - `tls-native-roots` / `tls-webpki-roots` - Root certificates

mod body;
mod connector;
mod hyper;

pub use body::TransportBody;
pub use connector::{build_https_connector, has_tls_support};

#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub use connector::default_tls_config;

pub use self::hyper::{HyperTransport, HyperTransportBuilder, RequestLine};

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use courier_core::Headers;
use http::{Method, StatusCode};

use crate::config::ResponseType;
use crate::interceptor::BoxFuture;

/// A fully resolved request, ready for the wire.
#[derive(Clone, Debug)]
pub struct TransportRequest {
    pub method: Method,
    /// URL with the query string already appended.
    pub url: String,
    /// Flat headers; groups have been folded away.
    pub headers: Headers,
    /// `None` when the request has no body.
    pub body: Option<Bytes>,
    /// `None` means wait indefinitely.
    pub timeout: Option<Duration>,
    /// Hint for custom transports; the dispatcher decodes the body itself
    /// and [`HyperTransport`] ignores it.
    pub response_type: ResponseType,
    /// Hint for transports that manage cookies or credentials; ignored by
    /// [`HyperTransport`].
    pub with_credentials: bool,
}

/// A raw response as read off the wire.
#[derive(Clone, Debug)]
pub struct TransportResponse {
    pub status: StatusCode,
    pub status_text: String,
    /// Flat headers keyed by lower-cased name.
    pub headers: Headers,
    pub body: Bytes,
}

/// Ways an exchange can fail below the HTTP status level.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The exchange could not be completed.
    #[error("{0}")]
    Network(String),

    /// No response within the given duration.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The exchange was aborted through its abort hook.
    #[error("request aborted")]
    Aborted,
}

/// Opaque transport-specific value describing the underlying request.
///
/// [`HyperTransport`] stores a [`RequestLine`]; use
/// [`downcast_ref`](Self::downcast_ref) to inspect it.
#[derive(Clone)]
pub struct TransportHandle(Arc<dyn Any + Send + Sync>);

impl TransportHandle {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        TransportHandle(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref()
    }
}

impl fmt::Debug for TransportHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TransportHandle").finish_non_exhaustive()
    }
}

type AbortHook = Box<dyn FnOnce() + Send>;

/// An in-flight exchange.
pub struct Exchange {
    handle: TransportHandle,
    outcome: BoxFuture<'static, Result<TransportResponse, TransportError>>,
    abort: Option<AbortHook>,
}

impl Exchange {
    pub fn new<F>(handle: TransportHandle, outcome: F) -> Self
    where
        F: Future<Output = Result<TransportResponse, TransportError>> + Send + 'static,
    {
        Self {
            handle,
            outcome: Box::pin(outcome),
            abort: None,
        }
    }

    /// Attach the hook run when the request is cancelled before settling.
    ///
    /// After the hook runs, the outcome future must settle (typically with
    /// [`TransportError::Aborted`]) rather than hang.
    pub fn on_abort<A>(mut self, abort: A) -> Self
    where
        A: FnOnce() + Send + 'static,
    {
        self.abort = Some(Box::new(abort));
        self
    }

    pub fn handle(&self) -> &TransportHandle {
        &self.handle
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        TransportHandle,
        BoxFuture<'static, Result<TransportResponse, TransportError>>,
        Option<AbortHook>,
    ) {
        (self.handle, self.outcome, self.abort)
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("handle", &self.handle)
            .field("abort", &self.abort.is_some())
            .finish_non_exhaustive()
    }
}

/// Puts a finalized request on the wire.
///
/// Status classification is not the transport's job: any response that
/// arrives, whatever its status, is `Ok`.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, request: TransportRequest) -> Exchange;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: TransportRequest) -> Exchange {
        (**self).send(request)
    }
}
