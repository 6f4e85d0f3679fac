//! Request failure types.
//!
//! This module provides [`HttpError`], the error type every request resolves
//! to when it does not produce a [`Response`].

use std::time::Duration;

use http::StatusCode;

use crate::cancel::Cancel;
use crate::config::RequestConfig;
use crate::response::Response;
use crate::transport::TransportHandle;

/// Machine-readable code attached to timeout failures.
pub const TIMEOUT_CODE: &str = "ECONNABORTED";

/// What went wrong with a request, without the attached context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The cancellation token fired.
    Cancelled,
    /// The transport could not complete the exchange.
    Network,
    /// The transport gave up after the configured timeout.
    Timeout,
    /// A response arrived with a status outside `[200, 300)`.
    Status,
    /// A transform or interceptor handler failed.
    Transform,
}

/// Everything known about a failed exchange.
#[derive(Clone, Debug)]
pub struct FailureContext {
    /// The effective configuration of the attempt.
    pub config: RequestConfig,
    /// Optional machine-readable code.
    pub code: Option<String>,
    /// Raw transport handle, when the transport got that far.
    pub request: Option<TransportHandle>,
    /// The response, present only when one was actually received.
    pub response: Option<Response>,
}

impl FailureContext {
    fn new(config: RequestConfig, request: Option<TransportHandle>) -> Box<Self> {
        Box::new(Self {
            config,
            code: None,
            request,
            response: None,
        })
    }
}

/// Request failure variants.
#[derive(Clone, Debug, thiserror::Error)]
pub enum HttpError {
    /// The request was cancelled before or during the transport call.
    #[error("{0}")]
    Cancelled(Cancel),

    /// Network-level failure; no response attached.
    #[error("{message}")]
    Network {
        message: String,
        context: Box<FailureContext>,
    },

    /// The transport timed out; no response attached.
    #[error("{message}")]
    Timeout {
        message: String,
        context: Box<FailureContext>,
    },

    /// Non-2xx status; the response is attached.
    #[error("{message}")]
    Status {
        message: String,
        context: Box<FailureContext>,
    },

    /// A transform or interceptor handler raised.
    #[error("transform error: {0}")]
    Transform(String),
}

impl HttpError {
    /// Create a transform failure, the variant handlers use to reject.
    pub fn transform<S: Into<String>>(message: S) -> Self {
        HttpError::Transform(message.into())
    }

    pub(crate) fn network<S: Into<String>>(
        message: S,
        config: RequestConfig,
        request: Option<TransportHandle>,
    ) -> Self {
        HttpError::Network {
            message: message.into(),
            context: FailureContext::new(config, request),
        }
    }

    pub(crate) fn timeout(
        timeout: Duration,
        config: RequestConfig,
        request: Option<TransportHandle>,
    ) -> Self {
        let mut context = FailureContext::new(config, request);
        context.code = Some(TIMEOUT_CODE.to_string());
        HttpError::Timeout {
            message: format!("Timeout of {} ms exceeded", timeout.as_millis()),
            context,
        }
    }

    pub(crate) fn from_status(response: Response) -> Self {
        let mut context =
            FailureContext::new(response.config.clone(), Some(response.request.clone()));
        let message = format!("Request failed with status code {}", response.status.as_u16());
        context.response = Some(response);
        HttpError::Status { message, context }
    }

    /// The failure category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HttpError::Cancelled(_) => ErrorKind::Cancelled,
            HttpError::Network { .. } => ErrorKind::Network,
            HttpError::Timeout { .. } => ErrorKind::Timeout,
            HttpError::Status { .. } => ErrorKind::Status,
            HttpError::Transform(_) => ErrorKind::Transform,
        }
    }

    /// Human-readable message.
    ///
    /// For cancellations this is the reason given to the canceler, or an
    /// empty string when none was given.
    pub fn message(&self) -> &str {
        match self {
            HttpError::Cancelled(cancel) => cancel.message().unwrap_or(""),
            HttpError::Network { message, .. }
            | HttpError::Timeout { message, .. }
            | HttpError::Status { message, .. }
            | HttpError::Transform(message) => message,
        }
    }

    fn context(&self) -> Option<&FailureContext> {
        match self {
            HttpError::Network { context, .. }
            | HttpError::Timeout { context, .. }
            | HttpError::Status { context, .. } => Some(context),
            HttpError::Cancelled(_) | HttpError::Transform(_) => None,
        }
    }

    /// The configuration of the failed attempt.
    pub fn config(&self) -> Option<&RequestConfig> {
        self.context().map(|context| &context.config)
    }

    /// Machine-readable code, e.g. [`TIMEOUT_CODE`].
    pub fn code(&self) -> Option<&str> {
        self.context().and_then(|context| context.code.as_deref())
    }

    /// The raw transport handle.
    pub fn request(&self) -> Option<&TransportHandle> {
        self.context().and_then(|context| context.request.as_ref())
    }

    /// The received response (only for [`HttpError::Status`]).
    pub fn response(&self) -> Option<&Response> {
        self.context().and_then(|context| context.response.as_ref())
    }

    /// Status code of the received response.
    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(|response| response.status)
    }

    /// Whether this failure is a cancellation.
    pub fn is_cancel(&self) -> bool {
        matches!(self, HttpError::Cancelled(_))
    }

    /// The cancellation reason, if this failure is a cancellation.
    pub fn cancel_reason(&self) -> Option<&Cancel> {
        match self {
            HttpError::Cancelled(cancel) => Some(cancel),
            _ => None,
        }
    }
}

impl From<Cancel> for HttpError {
    fn from(cancel: Cancel) -> Self {
        HttpError::Cancelled(cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error() {
        let config = RequestConfig::new().url("/slow");
        let err = HttpError::timeout(Duration::from_millis(1500), config, None);
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(err.message(), "Timeout of 1500 ms exceeded");
        assert_eq!(err.code(), Some(TIMEOUT_CODE));
        assert!(err.response().is_none());
        assert_eq!(err.config().and_then(|c| c.url.as_deref()), Some("/slow"));
    }

    #[test]
    fn test_network_error() {
        let err = HttpError::network("Network Error", RequestConfig::new(), None);
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(err.to_string(), "Network Error");
        assert!(err.code().is_none());
        assert!(err.status().is_none());
        assert!(!err.is_cancel());
    }

    #[test]
    fn test_cancelled_error() {
        let err = HttpError::from(Cancel::new("stopped"));
        assert!(err.is_cancel());
        assert_eq!(err.message(), "stopped");
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(err.config().is_none());
        assert_eq!(err.cancel_reason().and_then(Cancel::message), Some("stopped"));
    }

    #[test]
    fn test_status_error_carries_response() {
        let response = crate::response::Response {
            data: serde_json::json!("missing"),
            status: StatusCode::NOT_FOUND,
            status_text: "Not Found".into(),
            headers: courier_core::Headers::new(),
            config: RequestConfig::new().url("/nope"),
            request: crate::transport::TransportHandle::new("line"),
        };
        let err = HttpError::from_status(response);
        assert_eq!(err.kind(), ErrorKind::Status);
        assert_eq!(err.message(), "Request failed with status code 404");
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.response().map(|r| &r.data), Some(&serde_json::json!("missing")));
        assert!(err.request().is_some());
        assert!(err.code().is_none());
    }

    #[test]
    fn test_transform_error() {
        let err = HttpError::transform("bad payload");
        assert_eq!(err.kind(), ErrorKind::Transform);
        assert_eq!(err.message(), "bad payload");
        assert_eq!(err.to_string(), "transform error: bad payload");
    }
}
