//! Request configuration.
//!
//! [`RequestConfig`] describes one request. Every field is optional so that
//! "absent" stays distinguishable from "empty" when a per-call config is
//! merged over the client defaults (see [`merge_config`]).
//!
//! ```ignore
//! use courier_client::RequestConfig;
//! use std::time::Duration;
//!
//! let config = RequestConfig::new()
//!     .url("/base/get")
//!     .param("foo", "bar")
//!     .header("X-Trace", "1")
//!     .timeout(Duration::from_secs(2));
//! ```

mod merge;

pub use merge::merge_config;

use std::fmt;
use std::time::Duration;

use courier_core::{CONTENT_TYPE, HeaderEntry, Headers, ParamValue, Params};
use http::Method;
use serde_json::{Map, Value};

use crate::cancel::CancelToken;
use crate::transform::{Transform, default_request_transform, default_response_transform};

/// `Accept` sent with every request by default.
pub const DEFAULT_ACCEPT: &str = "application/json, text/plain, */*";

/// `Content-Type` for body-bearing methods by default.
pub const DEFAULT_FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// How the response body is handed to the response transforms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ResponseType {
    /// The body as a JSON string value.
    #[default]
    Text,
    /// The body parsed as JSON; `null` when it does not parse.
    Json,
}

/// Configuration for a single request.
#[derive(Clone, Default)]
pub struct RequestConfig {
    pub url: Option<String>,
    pub method: Option<Method>,
    /// Flat headers plus optional `common`/per-method groups.
    pub headers: Option<Headers>,
    pub params: Option<Params>,
    /// Request body before the request transforms run.
    pub data: Option<Value>,
    /// `Duration::ZERO` means no timeout.
    pub timeout: Option<Duration>,
    pub response_type: Option<ResponseType>,
    pub with_credentials: Option<bool>,
    pub cancel_token: Option<CancelToken>,
    pub transform_request: Option<Vec<Transform>>,
    pub transform_response: Option<Vec<Transform>>,
    /// Caller-defined keys the pipeline carries but does not interpret.
    pub extensions: Map<String, Value>,
}

impl RequestConfig {
    /// An empty config; every field absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// The library defaults every client starts from.
    pub fn defaults() -> Self {
        let mut headers = Headers::new();
        headers.group_mut("common").insert("Accept", DEFAULT_ACCEPT);
        for group in ["delete", "get", "head", "options"] {
            headers.group_mut(group);
        }
        for group in ["post", "put", "patch"] {
            headers
                .group_mut(group)
                .insert(CONTENT_TYPE, DEFAULT_FORM_CONTENT_TYPE);
        }

        Self {
            method: Some(Method::GET),
            headers: Some(headers),
            timeout: Some(Duration::ZERO),
            transform_request: Some(vec![default_request_transform()]),
            transform_response: Some(vec![default_response_transform()]),
            ..Self::default()
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set a flat header, creating the header mapping if needed.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<HeaderEntry>) -> Self {
        self.headers.get_or_insert_with(Headers::new).insert(name, value);
        self
    }

    /// Set a header inside a group such as `common` or `post`.
    pub fn group_header(
        mut self,
        group: &str,
        name: impl Into<String>,
        value: impl Into<HeaderEntry>,
    ) -> Self {
        self.headers
            .get_or_insert_with(Headers::new)
            .group_mut(group)
            .insert(name, value);
        self
    }

    /// Replace the whole header mapping.
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.get_or_insert_with(Params::new).insert(key, value);
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = Some(params);
        self
    }

    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    pub fn with_credentials(mut self, enabled: bool) -> Self {
        self.with_credentials = Some(enabled);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Replace the request transform list.
    pub fn transform_request(mut self, transforms: Vec<Transform>) -> Self {
        self.transform_request = Some(transforms);
        self
    }

    /// Replace the response transform list.
    pub fn transform_response(mut self, transforms: Vec<Transform>) -> Self {
        self.transform_response = Some(transforms);
        self
    }

    pub fn extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.insert(key.into(), value.into());
        self
    }

    /// The effective timeout; `None` when unset or zero.
    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout.filter(|timeout| !timeout.is_zero())
    }
}

impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("method", &self.method)
            .field("headers", &self.headers)
            .field("params", &self.params)
            .field("data", &self.data)
            .field("timeout", &self.timeout)
            .field("response_type", &self.response_type)
            .field("with_credentials", &self.with_credentials)
            .field("cancel_token", &self.cancel_token)
            .field("transform_request", &self.transform_request.as_ref().map(Vec::len))
            .field("transform_response", &self.transform_response.as_ref().map(Vec::len))
            .field("extensions", &self.extensions)
            .finish()
    }
}
