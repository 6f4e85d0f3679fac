//! Demo server for the client examples.
//!
//! Run with: cargo run --bin server
//! Then, in another terminal: cargo run --bin base-client
//!
//! The port comes from `PORT` (default 8080).

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

#[derive(Clone, Default)]
struct AppState {
    error_hits: Arc<AtomicUsize>,
}

/// Decode a JSON or urlencoded body into JSON.
fn decode_body(headers: &HeaderMap, body: &[u8]) -> Value {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if content_type.starts_with("application/x-www-form-urlencoded") {
        let form: serde_json::Map<String, Value> = url::form_urlencoded::parse(body)
            .map(|(k, v)| (k.into_owned(), Value::String(v.into_owned())))
            .collect();
        return Value::Object(form);
    }
    serde_json::from_slice(body).unwrap_or_else(|_| json!({}))
}

async fn echo(headers: HeaderMap, body: Bytes) -> Json<Value> {
    let data = decode_body(&headers, &body);
    tracing::info!(%data, "echo");
    Json(data)
}

async fn hello() -> Json<Value> {
    Json(json!({ "msg": "hello world" }))
}

/// Query pairs in arrival order, repeated keys included.
async fn base_get(Query(pairs): Query<Vec<(String, String)>>) -> Json<Vec<(String, String)>> {
    Json(pairs)
}

async fn base_buffer(body: Bytes) -> Json<Vec<u8>> {
    Json(body.to_vec())
}

/// Fails every other call.
async fn error_get(State(state): State<AppState>) -> Response {
    if state.error_hits.fetch_add(1, Ordering::Relaxed) % 2 == 0 {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    } else {
        hello().await.into_response()
    }
}

async fn error_timeout() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    hello().await
}

async fn extend_user() -> Json<Value> {
    Json(json!({
        "code": 0,
        "message": "ok",
        "result": { "name": "Alice", "age": 18 },
    }))
}

async fn cancel_get() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(1)).await;
    Json(json!("hello"))
}

async fn cancel_post(headers: HeaderMap, body: Bytes) -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(1)).await;
    echo(headers, body).await
}

fn router() -> Router {
    Router::new()
        .route("/simple/get", get(hello))
        .route("/base/get", get(base_get))
        .route("/base/post", post(echo))
        .route("/base/buffer", post(base_buffer))
        .route("/error/get", get(error_get))
        .route("/error/timeout", get(error_timeout))
        .route("/extend/get", get(hello))
        .route("/extend/options", axum::routing::options(|| async {}))
        .route("/extend/head", axum::routing::head(|| async {}))
        .route("/extend/delete", axum::routing::delete(|| async {}))
        .route("/extend/post", post(echo))
        .route("/extend/put", axum::routing::put(echo))
        .route("/extend/patch", axum::routing::patch(echo))
        .route("/extend/user", get(extend_user))
        .route("/interceptor/get", get(|| async { "hello " }))
        .route("/config/post", post(echo))
        .route("/cancel/get", get(cancel_get))
        .route("/cancel/post", post(cancel_post))
        .with_state(AppState::default())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    courier_examples::init_tracing();

    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    println!("=== Courier demo server ===");
    println!("Server listening on http://{}, Ctrl+C to stop", addr);

    axum::serve(listener, router()).await?;
    Ok(())
}
