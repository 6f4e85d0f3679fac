//! An interceptable, cancellable HTTP client.
//!
//! Every call runs through one pipeline:
//!
//! ```text
//! request interceptors ─► request transforms ─► transport ─► response transforms ─► response interceptors
//! ```
//!
//! Interceptors run in registration order and may be sync or async. A
//! [`CancelToken`] aborts the pipeline before or during the transport call,
//! and a call settles exactly once.
//!
//! ## Example
//!
//! ```ignore
//! use courier_client::{CancelToken, Client, Interceptor, RequestConfig};
//! use serde_json::json;
//!
//! let client = Client::new()?;
//!
//! client.interceptors().request.register(Interceptor::new(|config| {
//!     Ok(config.header("X-Trace", "1"))
//! }));
//!
//! let res = client
//!     .post("http://localhost:8080/base/post", json!({"a": 1, "b": 2}))
//!     .await?;
//! println!("{} {}", res.status, res.data);
//!
//! let source = CancelToken::source();
//! let pending = client.get_with(
//!     "http://localhost:8080/cancel/get",
//!     RequestConfig::new().cancel_token(source.token.clone()),
//! );
//! source.cancel.cancel("Operation canceled by the user.");
//! let err = pending.await.unwrap_err();
//! assert!(courier_client::is_cancel(&err));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `tls` | `tls-ring` + `tls-native-roots` | yes |
//! | `tls-ring` / `tls-aws-lc` | rustls crypto provider | |
//! | `tls-native-roots` / `tls-webpki-roots` | root certificates | |
//! | `tracing` | `http.request` spans and dispatch state events | yes |

pub mod builder;
pub mod cancel;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod interceptor;
pub mod response;
pub mod transform;
pub mod transport;

pub use builder::{ClientBuildError, ClientBuilder};
pub use cancel::{Cancel, CancelToken, CancelTokenSource, Canceler, is_cancel};
pub use client::Client;
pub use config::{RequestConfig, ResponseType, merge_config};
pub use dispatch::{DispatchState, dispatch_request};
pub use error::{ErrorKind, FailureContext, HttpError, TIMEOUT_CODE};
pub use interceptor::{BoxFuture, Interceptor, InterceptorId, InterceptorManager, Interceptors};
pub use response::Response;
pub use transform::{Transform, default_request_transform, default_response_transform, transform};
pub use transport::{
    Exchange, HyperTransport, HyperTransportBuilder, Transport, TransportError, TransportHandle,
    TransportRequest, TransportResponse,
};

pub use courier_core::{HeaderEntry, Headers, ParamValue, Params, build_url, serialize_params};

/// A client over the default transport whose defaults are the library
/// defaults merged with `config`.
pub fn create(config: RequestConfig) -> Result<Client, ClientBuildError> {
    ClientBuilder::new().merge_defaults(config).build()
}
