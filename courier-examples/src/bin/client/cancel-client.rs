//! Cancelling requests.
//!
//! Usage:
//!   cargo run --bin server
//!   cargo run --bin cancel-client [-- http://localhost:8080]

use std::time::Duration;

use courier_client::{CancelToken, Client, RequestConfig, is_cancel};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    courier_examples::init_tracing();
    let base_url = courier_examples::server_url();
    let client = Client::new()?;

    println!("=== Cancel Client ===");
    println!("Server URL: {}", base_url);
    println!();

    println!("Test 1: Cancel an in-flight request, then reuse the token...");
    {
        let source = CancelToken::source();
        let pending = tokio::spawn({
            let client = client.clone();
            let config = RequestConfig::new().cancel_token(source.token.clone());
            let url = format!("{base_url}/cancel/get");
            async move { client.get_with(url, config).await }
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        source.cancel.cancel("Operation canceled by the user.");

        let err = pending.await?.expect_err("request was cancelled");
        assert!(is_cancel(&err));
        println!("  PASS: Request canceled {}", err);

        let err = client
            .post_with(
                format!("{base_url}/cancel/post"),
                json!({"a": 1}),
                RequestConfig::new().cancel_token(source.token.clone()),
            )
            .await
            .expect_err("token already cancelled");
        assert!(is_cancel(&err));
        println!("  PASS: {}", err);
    }

    println!("Test 2: Canceler captured from an executor...");
    {
        let mut captured = None;
        let token = CancelToken::new(|cancel| captured = Some(cancel));
        let cancel = captured.ok_or_else(|| anyhow::anyhow!("executor did not run"))?;

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel("xxx");
        });

        let err = client
            .get_with(
                format!("{base_url}/cancel/get"),
                RequestConfig::new().cancel_token(token),
            )
            .await
            .expect_err("cancelled after 200ms");
        assert!(is_cancel(&err));
        println!("  PASS: Request canceled ({})", err.message());
    }

    println!();
    println!("=== All cancel tests passed ===");
    Ok(())
}
