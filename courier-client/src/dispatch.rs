//! One request attempt: transform, send, settle.
//!
//! ```text
//! Pending ──► Cancelled                    (token already fired)
//!    │
//!    ▼
//! Transformed ──► Cancelled                (token fired before send)
//!    │
//!    ▼
//!  Sent ──► Succeeded | Failed | Cancelled (token won the race)
//! ```

use bytes::Bytes;
use courier_core::{build_url, flatten_headers};
use http::Method;
use serde_json::Value;

use crate::cancel::{Cancel, CancelToken};
use crate::config::{RequestConfig, ResponseType};
use crate::error::HttpError;
use crate::response::Response;
use crate::transform::transform;
use crate::transport::{
    Transport, TransportError, TransportHandle, TransportRequest, TransportResponse,
};

/// Where an attempt is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchState {
    Pending,
    Transformed,
    Sent,
    Succeeded,
    Failed,
    Cancelled,
}

struct Attempt {
    state: DispatchState,
}

impl Attempt {
    fn new() -> Self {
        Self {
            state: DispatchState::Pending,
        }
    }

    fn advance(&mut self, next: DispatchState) {
        #[cfg(feature = "tracing")]
        tracing::debug!(from = ?self.state, to = ?next, "dispatch state");
        self.state = next;
    }

    fn cancelled(&mut self, reason: Cancel) -> HttpError {
        self.advance(DispatchState::Cancelled);
        HttpError::Cancelled(reason)
    }

    fn settled<T>(&mut self, result: Result<T, HttpError>) -> Result<T, HttpError> {
        self.advance(match &result {
            Ok(_) => DispatchState::Succeeded,
            Err(HttpError::Cancelled(_)) => DispatchState::Cancelled,
            Err(_) => DispatchState::Failed,
        });
        result
    }
}

/// Run one attempt of `config` over `transport`.
///
/// A token that has already fired short-circuits before the transport is
/// touched. Once sent, the exchange races the token; whichever settles
/// first decides the outcome and the other is discarded.
pub async fn dispatch_request(
    transport: &dyn Transport,
    config: RequestConfig,
) -> Result<Response, HttpError> {
    let mut attempt = Attempt::new();
    let token = config.cancel_token.clone();

    if let Some(reason) = token.as_ref().and_then(CancelToken::reason) {
        return Err(attempt.cancelled(reason));
    }

    let (config, request) = match prepare(config) {
        Ok(prepared) => prepared,
        Err(error) => return attempt.settled(Err(error)),
    };
    attempt.advance(DispatchState::Transformed);

    if let Some(reason) = token.as_ref().and_then(CancelToken::reason) {
        return Err(attempt.cancelled(reason));
    }

    let (handle, outcome, abort) = transport.send(request).into_parts();
    attempt.advance(DispatchState::Sent);

    let outcome = match token {
        Some(token) => tokio::select! {
            biased;
            reason = token.cancelled() => {
                if let Some(abort) = abort {
                    abort();
                }
                return Err(attempt.cancelled(reason));
            }
            outcome = outcome => outcome,
        },
        None => outcome.await,
    };

    attempt.settled(settle(config, handle, outcome))
}

/// Resolve the URL, run the request transforms and flatten the headers.
///
/// The returned config reflects the request as sent and is echoed on the
/// response.
fn prepare(mut config: RequestConfig) -> Result<(RequestConfig, TransportRequest), HttpError> {
    let method = config.method.clone().unwrap_or(Method::GET);
    let url = build_url(config.url.as_deref().unwrap_or_default(), config.params.as_ref());

    let mut headers = config.headers.take().unwrap_or_default();
    let data = transform(
        config.data.take().unwrap_or(Value::Null),
        &mut headers,
        config.transform_request.as_deref(),
    )?;
    let headers = flatten_headers(&headers, &method);
    let body = encode_body(&data)?;

    let request = TransportRequest {
        method: method.clone(),
        url: url.clone(),
        headers: headers.clone(),
        body,
        timeout: config.effective_timeout(),
        response_type: config.response_type.unwrap_or_default(),
        with_credentials: config.with_credentials.unwrap_or(false),
    };

    config.method = Some(method);
    config.url = Some(url);
    config.headers = Some(headers);
    config.data = (!data.is_null()).then_some(data);
    Ok((config, request))
}

fn encode_body(data: &Value) -> Result<Option<Bytes>, HttpError> {
    match data {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(Bytes::from(text.clone()))),
        other => serde_json::to_vec(other)
            .map(|bytes| Some(Bytes::from(bytes)))
            .map_err(|e| HttpError::transform(format!("failed to encode request data: {e}"))),
    }
}

fn decode_body(body: &Bytes, response_type: ResponseType) -> Value {
    match response_type {
        ResponseType::Text => Value::String(String::from_utf8_lossy(body).into_owned()),
        ResponseType::Json => serde_json::from_slice(body).unwrap_or(Value::Null),
    }
}

/// Classify the transport outcome and build the response or failure.
fn settle(
    config: RequestConfig,
    handle: TransportHandle,
    outcome: Result<TransportResponse, TransportError>,
) -> Result<Response, HttpError> {
    let raw = match outcome {
        Ok(raw) => raw,
        Err(TransportError::Network(message)) => {
            return Err(HttpError::network(message, config, Some(handle)));
        }
        Err(TransportError::Timeout(limit)) => {
            return Err(HttpError::timeout(limit, config, Some(handle)));
        }
        Err(TransportError::Aborted) => {
            let reason = config
                .cancel_token
                .as_ref()
                .and_then(CancelToken::reason)
                .unwrap_or_else(|| Cancel::new("Request aborted"));
            return Err(HttpError::Cancelled(reason));
        }
    };

    let response_type = config.response_type.unwrap_or_default();
    let mut response = Response {
        data: decode_body(&raw.body, response_type),
        status: raw.status,
        status_text: raw.status_text,
        headers: raw.headers,
        config,
        request: handle,
    };

    if !response.status.is_success() {
        return Err(HttpError::from_status(response));
    }

    let data = std::mem::take(&mut response.data);
    response.data = transform(
        data,
        &mut response.headers,
        response.config.transform_response.as_deref(),
    )?;
    Ok(response)
}
