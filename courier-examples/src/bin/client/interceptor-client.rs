//! Request and response interceptors.
//!
//! Request interceptors append to a header in registration order; response
//! interceptors append to the body. One of each is unregistered before the
//! call and never runs.
//!
//! Usage:
//!   cargo run --bin server
//!   cargo run --bin interceptor-client [-- http://localhost:8080]

use std::time::Duration;

use courier_client::{Client, Interceptor, RequestConfig, Response};
use serde_json::Value;

fn append_header(config: RequestConfig, tag: &str) -> RequestConfig {
    let current = config
        .headers
        .as_ref()
        .and_then(|h| h.get("test"))
        .and_then(|e| e.as_str())
        .unwrap_or_default()
        .to_string();
    config.header("test", format!("{current}{tag}"))
}

fn append_body(mut res: Response, tag: &str) -> Response {
    let text = res.data.as_str().unwrap_or_default().to_string();
    res.data = Value::String(text + tag);
    res
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    courier_examples::init_tracing();
    let base_url = courier_examples::server_url();
    let client = Client::new()?;

    println!("=== Interceptor Client ===");
    println!("Server URL: {}", base_url);
    println!();

    let interceptors = client.interceptors();
    interceptors
        .request
        .register(Interceptor::new(|config: RequestConfig| Ok(append_header(config, "1"))));
    interceptors
        .request
        .register(Interceptor::new(|config: RequestConfig| Ok(append_header(config, "2"))));
    interceptors.request.register(Interceptor::from_async(|config: RequestConfig| async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Ok(append_header(config, "3"))
    }));

    interceptors
        .response
        .register(Interceptor::new(|res: Response| Ok(append_body(res, "1"))));
    let dropped = interceptors
        .response
        .register(Interceptor::new(|res: Response| Ok(append_body(res, "2"))));
    interceptors
        .response
        .register(Interceptor::new(|res: Response| Ok(append_body(res, "3"))));
    interceptors.response.unregister(dropped);

    println!("Test 1: Interceptors run in registration order...");
    {
        let res = client.get(format!("{base_url}/interceptor/get")).await?;
        assert_eq!(res.data, "hello 13");
        let line = res
            .config
            .headers
            .as_ref()
            .and_then(|h| h.get("test"))
            .and_then(|e| e.as_str())
            .unwrap_or_default()
            .to_string();
        assert_eq!(line, "123");
        println!("  PASS: body {:?}, request header test={}", res.data, line);
    }

    println!();
    println!("=== All interceptor tests passed ===");
    Ok(())
}
