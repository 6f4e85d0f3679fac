//! Hyper-based HTTP transport.
//!
//! This module provides [`HyperTransport`], the default [`Transport`] using
//! hyper_util's legacy client. Each exchange runs on its own tokio task so
//! the abort hook can stop it wherever it is suspended.

use std::time::Duration;

use courier_core::{CONTENT_TYPE, Headers};
use http::{Method, Uri};
use http_body_util::BodyExt;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use rustls::ClientConfig;
use tokio::task::AbortHandle;

use super::body::TransportBody;
use super::connector::build_https_connector;
use super::{
    Exchange, Transport, TransportError, TransportHandle, TransportRequest, TransportResponse,
};
use crate::builder::ClientBuildError;

/// Message of every network-level failure.
const NETWORK_ERROR: &str = "Network Error";

type HyperClient = Client<HttpsConnector<HttpConnector>, TransportBody>;

/// The handle [`HyperTransport`] attaches to responses and failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    pub url: String,
}

/// HTTP transport using hyper_util's legacy client.
///
/// # Example
///
/// ```ignore
/// use courier_client::{Client, transport::HyperTransport};
///
/// let transport = HyperTransport::builder()
///     .http2_only(true)
///     .build()?;
/// let client = Client::builder().transport(transport).build()?;
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    http2_only: bool,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("http2_only", &self.http2_only)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    pub fn builder() -> HyperTransportBuilder {
        HyperTransportBuilder::new()
    }

    /// Create a transport with default settings.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::builder().build()
    }

    pub fn is_http2_only(&self) -> bool {
        self.http2_only
    }
}

impl Transport for HyperTransport {
    fn send(&self, request: TransportRequest) -> Exchange {
        let handle = TransportHandle::new(RequestLine {
            method: request.method.clone(),
            url: request.url.clone(),
        });

        let task = tokio::spawn(execute(self.client.clone(), request));
        let abort = task.abort_handle();
        let guard = AbortOnDrop(task.abort_handle());
        let outcome = async move {
            let _guard = guard;
            match task.await {
                Ok(outcome) => outcome,
                Err(e) if e.is_cancelled() => Err(TransportError::Aborted),
                Err(e) => Err(TransportError::Network(format!("{NETWORK_ERROR}: {e}"))),
            }
        };

        Exchange::new(handle, outcome).on_abort(move || abort.abort())
    }
}

/// Aborts the spawned exchange once nobody waits for its outcome.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn execute(
    client: HyperClient,
    request: TransportRequest,
) -> Result<TransportResponse, TransportError> {
    match request.timeout {
        Some(limit) => tokio::time::timeout(limit, round_trip(client, request))
            .await
            .map_err(|_| TransportError::Timeout(limit))?,
        None => round_trip(client, request).await,
    }
}

async fn round_trip(
    client: HyperClient,
    request: TransportRequest,
) -> Result<TransportResponse, TransportError> {
    let TransportRequest {
        method,
        url,
        mut headers,
        body,
        ..
    } = request;

    if body.is_none() {
        strip_content_type(&mut headers);
    }
    let header_map = headers
        .to_header_map()
        .map_err(|e| TransportError::Network(e.to_string()))?;

    let mut http_request = http::Request::builder()
        .method(method)
        .uri(parse_uri(&url)?)
        .body(TransportBody::from(body))
        .map_err(|e| TransportError::Network(e.to_string()))?;
    http_request.headers_mut().extend(header_map);

    let response = client
        .request(http_request)
        .await
        .map_err(|e| network_failure(&url, &e))?;

    let (parts, body) = response.into_parts();
    let body = body
        .collect()
        .await
        .map_err(|e| TransportError::Network(format!("{NETWORK_ERROR}: {e}")))?
        .to_bytes();

    Ok(TransportResponse {
        status: parts.status,
        status_text: parts.status.canonical_reason().unwrap_or_default().to_string(),
        headers: Headers::from(&parts.headers),
        body,
    })
}

/// Connection-level failures surface as a bare "Network Error"; the cause
/// is only logged.
#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn network_failure(url: &str, error: &hyper_util::client::legacy::Error) -> TransportError {
    #[cfg(feature = "tracing")]
    tracing::debug!(%error, %url, "request failed");
    TransportError::Network(NETWORK_ERROR.to_string())
}

/// A body-less request carries no `Content-Type`, whatever its spelling.
fn strip_content_type(headers: &mut Headers) {
    let names: Vec<String> = headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case(CONTENT_TYPE))
        .map(|(name, _)| name.to_string())
        .collect();
    for name in names {
        headers.remove(&name);
    }
}

/// Parse `url`, escaping the `[` and `]` the query serializer leaves literal
/// if the strict parser rejects them.
fn parse_uri(url: &str) -> Result<Uri, TransportError> {
    url.parse::<Uri>()
        .or_else(|_| url.replace('[', "%5B").replace(']', "%5D").parse::<Uri>())
        .map_err(|e| TransportError::Network(format!("invalid url {url:?}: {e}")))
}

/// Builder for [`HyperTransport`].
pub struct HyperTransportBuilder {
    /// Custom TLS configuration.
    tls_config: Option<ClientConfig>,
    /// Force HTTP/2 only (h2c, or when the server only speaks HTTP/2).
    http2_only: bool,
    /// Connection pool idle timeout.
    pool_idle_timeout: Option<Duration>,
    /// Maximum idle connections per host.
    pool_max_idle_per_host: usize,
}

impl Default for HyperTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperTransportBuilder {
    pub fn new() -> Self {
        Self {
            tls_config: None,
            http2_only: false,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }

    /// Use a custom TLS configuration (custom roots, client certificates).
    pub fn tls_config(mut self, config: ClientConfig) -> Self {
        self.tls_config = Some(config);
        self
    }

    /// Speak HTTP/2 directly without the HTTP/1.1 upgrade.
    pub fn http2_only(mut self, enabled: bool) -> Self {
        self.http2_only = enabled;
        self
    }

    /// Default: 90 seconds.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Default: 32.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    pub fn build(self) -> Result<HyperTransport, ClientBuildError> {
        let https_connector = build_https_connector(self.tls_config)?;

        let mut builder = Client::builder(TokioExecutor::new());
        // Required for pool_idle_timeout to take effect.
        builder.pool_timer(TokioTimer::new());
        if let Some(timeout) = self.pool_idle_timeout {
            builder.pool_idle_timeout(timeout);
        }
        builder.pool_max_idle_per_host(self.pool_max_idle_per_host);
        if self.http2_only {
            builder.http2_only(true);
        }

        Ok(HyperTransport {
            client: builder.build(https_connector),
            http2_only: self.http2_only,
        })
    }
}

impl std::fmt::Debug for HyperTransportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransportBuilder")
            .field("tls_config", &self.tls_config.is_some())
            .field("http2_only", &self.http2_only)
            .field("pool_idle_timeout", &self.pool_idle_timeout)
            .field("pool_max_idle_per_host", &self.pool_max_idle_per_host)
            .finish()
    }
}
