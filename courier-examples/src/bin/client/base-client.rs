//! Basic requests against the demo server.
//!
//! Usage:
//!   # First, start the server in another terminal:
//!   cargo run --bin server
//!
//!   # Then run the client (defaults to http://localhost:8080):
//!   cargo run --bin base-client
//!
//!   # Or specify a custom server URL:
//!   cargo run --bin base-client -- http://localhost:9000

use std::time::Duration;

use courier_client::{Client, ErrorKind, ParamValue, RequestConfig};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    courier_examples::init_tracing();
    let base_url = courier_examples::server_url();
    let client = Client::new()?;

    println!("=== Base Client ===");
    println!("Server URL: {}", base_url);
    println!();

    println!("Test 1: Simple GET...");
    {
        let res = client.get(format!("{base_url}/simple/get")).await?;
        assert_eq!(res.data, json!({"msg": "hello world"}));
        println!("  PASS: {} {}", res.status, res.data);
    }

    println!("Test 2: GET with params...");
    {
        let res = client
            .get_with(
                format!("{base_url}/base/get#hash"),
                RequestConfig::new()
                    .param("foo", vec!["bar", "baz"])
                    .param("bar", json!({"baz": 1}))
                    .param("special", "@:$, ")
                    .param("skipped", ParamValue::Null),
            )
            .await?;
        println!("  PASS: server saw {}", res.data);
    }

    println!("Test 3: POST a JSON object...");
    {
        let res = client
            .post(format!("{base_url}/base/post"), json!({"a": 1, "b": 2}))
            .await?;
        assert_eq!(res.data, json!({"a": 1, "b": 2}));
        println!("  PASS: echoed {}", res.data);
    }

    println!("Test 4: POST a urlencoded string...");
    {
        let res = client
            .post(format!("{base_url}/base/post"), "a=1&b=2")
            .await?;
        assert_eq!(res.data, json!({"a": "1", "b": "2"}));
        println!("  PASS: echoed {}", res.data);
    }

    println!("Test 5: Status errors carry the response...");
    {
        for _ in 0..2 {
            match client.get(format!("{base_url}/error/get")).await {
                Ok(res) => println!("  PASS: success {}", res.data),
                Err(e) => {
                    assert_eq!(e.kind(), ErrorKind::Status);
                    let status = e.status();
                    println!("  PASS: {} (status {:?})", e, status);
                }
            }
        }
    }

    println!("Test 6: Timeout...");
    {
        let err = client
            .get_with(
                format!("{base_url}/error/timeout"),
                RequestConfig::new().timeout(Duration::from_secs(2)),
            )
            .await
            .expect_err("the server sleeps for 3 seconds");
        assert_eq!(err.kind(), ErrorKind::Timeout);
        println!("  PASS: {} (code {:?})", err, err.code());
    }

    println!();
    println!("=== All base tests passed ===");
    Ok(())
}
