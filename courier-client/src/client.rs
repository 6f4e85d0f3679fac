//! The client façade.
//!
//! This module provides [`Client`]: stored defaults, the two interceptor
//! registries and a transport, assembled into one pipeline per call.

use std::sync::{Arc, PoisonError, RwLock};
use std::task::{Context, Poll};

use http::Method;
use serde_json::Value;
use tower_service::Service;

use crate::builder::{ClientBuildError, ClientBuilder};
use crate::config::{RequestConfig, merge_config};
use crate::dispatch::dispatch_request;
use crate::error::HttpError;
use crate::interceptor::{BoxFuture, Interceptor, Interceptors};
use crate::response::Response;
use crate::transport::Transport;

struct ClientInner {
    defaults: RwLock<RequestConfig>,
    interceptors: Interceptors,
    transport: Arc<dyn Transport>,
}

/// An HTTP client with defaults, interceptors and cancellation support.
///
/// Cloning is cheap and clones share defaults and interceptors. Use
/// [`Client::create`] for an independent instance.
///
/// # Example
///
/// ```ignore
/// use courier_client::{Client, RequestConfig};
/// use serde_json::json;
///
/// let client = Client::new()?;
/// let res = client.get("http://localhost:8080/simple/get").await?;
/// let res = client
///     .post_with(
///         "http://localhost:8080/base/post",
///         json!({"a": 1}),
///         RequestConfig::new().header("X-Trace", "1"),
///     )
///     .await?;
/// println!("{}", res.data);
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("defaults", &self.defaults())
            .field("interceptors", &self.inner.interceptors)
            .finish_non_exhaustive()
    }
}

/// The stages of one call, snapshotted from the registries.
struct Chain {
    request: Vec<Interceptor<RequestConfig>>,
    response: Vec<Interceptor<Response>>,
}

impl Chain {
    /// Fold `config` through request interceptors, dispatch and response
    /// interceptors, strictly in that order.
    async fn run(
        self,
        transport: &dyn Transport,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            request_interceptors = self.request.len(),
            response_interceptors = self.response.len(),
            "running chain"
        );

        let mut config = Ok(config);
        for stage in &self.request {
            config = stage.run(config).await;
        }

        // Dispatch has no rejection handler; failures pass straight through.
        let mut response = match config {
            Ok(config) => dispatch_request(transport, config).await,
            Err(error) => Err(error),
        };

        for stage in &self.response {
            response = stage.run(response).await;
        }
        response
    }
}

impl Client {
    /// A client over the hyper transport with the library defaults.
    pub fn new() -> Result<Self, ClientBuildError> {
        ClientBuilder::new().build()
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_parts(transport: Arc<dyn Transport>, defaults: RequestConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                defaults: RwLock::new(defaults),
                interceptors: Interceptors::default(),
                transport,
            }),
        }
    }

    /// A snapshot of the stored defaults.
    pub fn defaults(&self) -> RequestConfig {
        self.inner
            .defaults
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Edit the stored defaults in place. Calls already in flight keep the
    /// defaults they started with.
    pub fn update_defaults<F>(&self, edit: F)
    where
        F: FnOnce(&mut RequestConfig),
    {
        let mut defaults = self
            .inner
            .defaults
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        edit(&mut defaults);
    }

    /// The request and response interceptor registries.
    pub fn interceptors(&self) -> &Interceptors {
        &self.inner.interceptors
    }

    /// A new client whose defaults are this client's merged with
    /// `overrides`. It shares the transport and nothing mutable.
    pub fn create(&self, overrides: RequestConfig) -> Client {
        Client::from_parts(
            Arc::clone(&self.inner.transport),
            merge_config(&self.defaults(), &overrides),
        )
    }

    /// Send `config` merged over the defaults through the full pipeline.
    pub async fn request(&self, config: RequestConfig) -> Result<Response, HttpError> {
        let config = merge_config(&self.defaults(), &config);
        let chain = Chain {
            request: self.inner.interceptors.request.snapshot(),
            response: self.inner.interceptors.response.snapshot(),
        };

        #[cfg(feature = "tracing")]
        let span = tracing::info_span!(
            "http.request",
            http.method = %config.method.as_ref().unwrap_or(&Method::GET),
            http.url = config.url.as_deref().unwrap_or_default(),
            otel.kind = "client",
        );

        let call = chain.run(self.inner.transport.as_ref(), config);
        #[cfg(feature = "tracing")]
        let call = tracing::Instrument::instrument(call, span);
        call.await
    }

    /// [`request`](Self::request) with `url` set on `config`.
    pub async fn request_url(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.request(config.url(url)).await
    }

    async fn send_without_data(
        &self,
        method: Method,
        url: String,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.request(config.method(method).url(url)).await
    }

    async fn send_with_data(
        &self,
        method: Method,
        url: String,
        data: Value,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.request(config.method(method).url(url).data(data)).await
    }

    pub async fn get(&self, url: impl Into<String>) -> Result<Response, HttpError> {
        self.get_with(url, RequestConfig::new()).await
    }

    pub async fn get_with(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.send_without_data(Method::GET, url.into(), config).await
    }

    pub async fn delete(&self, url: impl Into<String>) -> Result<Response, HttpError> {
        self.delete_with(url, RequestConfig::new()).await
    }

    pub async fn delete_with(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.send_without_data(Method::DELETE, url.into(), config).await
    }

    pub async fn head(&self, url: impl Into<String>) -> Result<Response, HttpError> {
        self.head_with(url, RequestConfig::new()).await
    }

    pub async fn head_with(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.send_without_data(Method::HEAD, url.into(), config).await
    }

    pub async fn options(&self, url: impl Into<String>) -> Result<Response, HttpError> {
        self.options_with(url, RequestConfig::new()).await
    }

    pub async fn options_with(
        &self,
        url: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.send_without_data(Method::OPTIONS, url.into(), config).await
    }

    pub async fn post(
        &self,
        url: impl Into<String>,
        data: impl Into<Value>,
    ) -> Result<Response, HttpError> {
        self.post_with(url, data, RequestConfig::new()).await
    }

    pub async fn post_with(
        &self,
        url: impl Into<String>,
        data: impl Into<Value>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.send_with_data(Method::POST, url.into(), data.into(), config)
            .await
    }

    pub async fn put(
        &self,
        url: impl Into<String>,
        data: impl Into<Value>,
    ) -> Result<Response, HttpError> {
        self.put_with(url, data, RequestConfig::new()).await
    }

    pub async fn put_with(
        &self,
        url: impl Into<String>,
        data: impl Into<Value>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.send_with_data(Method::PUT, url.into(), data.into(), config)
            .await
    }

    pub async fn patch(
        &self,
        url: impl Into<String>,
        data: impl Into<Value>,
    ) -> Result<Response, HttpError> {
        self.patch_with(url, data, RequestConfig::new()).await
    }

    pub async fn patch_with(
        &self,
        url: impl Into<String>,
        data: impl Into<Value>,
        config: RequestConfig,
    ) -> Result<Response, HttpError> {
        self.send_with_data(Method::PATCH, url.into(), data.into(), config)
            .await
    }
}

impl Service<RequestConfig> for Client {
    type Response = Response;
    type Error = HttpError;
    type Future = BoxFuture<'static, Result<Response, HttpError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, config: RequestConfig) -> Self::Future {
        let client = self.clone();
        Box::pin(async move { client.request(config).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Exchange, TransportHandle, TransportRequest, TransportResponse};
    use bytes::Bytes;
    use courier_core::Headers;
    use http::StatusCode;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Echoes method and url back as the JSON body.
    #[derive(Default)]
    struct Echo {
        urls: Mutex<Vec<String>>,
    }

    impl Transport for Echo {
        fn send(&self, request: TransportRequest) -> Exchange {
            self.urls.lock().unwrap().push(request.url.clone());
            let body = serde_json::json!({
                "method": request.method.as_str(),
                "url": request.url,
                "body": request.body.map(|b| String::from_utf8_lossy(&b).into_owned()),
            });
            Exchange::new(TransportHandle::new(()), async move {
                Ok(TransportResponse {
                    status: StatusCode::OK,
                    status_text: "OK".into(),
                    headers: Headers::new(),
                    body: Bytes::from(body.to_string()),
                })
            })
        }
    }

    fn client() -> Client {
        Client::from_parts(Arc::new(Echo::default()), RequestConfig::defaults())
    }

    #[tokio::test]
    async fn test_shorthands_inject_method_url_and_data() {
        let client = client();

        let res = client.delete("/extend/delete").await.unwrap();
        assert_eq!(res.data["method"], "DELETE");
        assert_eq!(res.data["url"], "/extend/delete");

        let res = client.put("/extend/put", serde_json::json!({"msg": "put"})).await.unwrap();
        assert_eq!(res.data["method"], "PUT");
        assert_eq!(res.data["body"], r#"{"msg":"put"}"#);

        let res = client
            .request_url("/extend/post", RequestConfig::new().method(Method::POST))
            .await
            .unwrap();
        assert_eq!(res.data["method"], "POST");
    }

    #[tokio::test]
    async fn test_create_merges_defaults_and_isolates_interceptors() {
        let parent = client();
        parent.interceptors().request.register(Interceptor::new(|config: RequestConfig| {
            Ok(config.url("/parent-only"))
        }));

        let child = parent.create(RequestConfig::new().timeout(Duration::from_secs(3)));
        assert_eq!(child.defaults().timeout, Some(Duration::from_secs(3)));
        assert_eq!(parent.defaults().timeout, Some(Duration::ZERO));
        assert_eq!(child.interceptors().request.active_count(), 0);

        let res = child.get("/child").await.unwrap();
        assert_eq!(res.data["url"], "/child");
    }

    #[tokio::test]
    async fn test_update_defaults() {
        let client = client();
        client.update_defaults(|defaults| {
            defaults.params = Some(courier_core::Params::new().with("token", "abc"));
        });
        let res = client.get("/with-token").await.unwrap();
        assert_eq!(res.data["url"], "/with-token?token=abc");
    }

    #[tokio::test]
    async fn test_service_call() {
        let mut client = client();
        let res = Service::call(&mut client, RequestConfig::new().url("/svc")).await.unwrap();
        assert_eq!(res.data["url"], "/svc");
    }
}
