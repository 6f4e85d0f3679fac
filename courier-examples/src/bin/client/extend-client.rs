//! Method shorthands and typed response bodies.
//!
//! Usage:
//!   cargo run --bin server
//!   cargo run --bin extend-client [-- http://localhost:8080]

use courier_client::{Client, RequestConfig};
use http::Method;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct ResponseData<T> {
    code: i64,
    message: String,
    result: T,
}

#[derive(Debug, Deserialize)]
struct User {
    name: String,
    age: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    courier_examples::init_tracing();
    let base_url = courier_examples::server_url();
    let client = Client::new()?;

    println!("=== Extend Client ===");
    println!("Server URL: {}", base_url);
    println!();

    println!("Test 1: Full config through request()...");
    {
        let res = client
            .request(
                RequestConfig::new()
                    .url(format!("{base_url}/extend/post"))
                    .method(Method::POST)
                    .data(json!({"msg": "hi"})),
            )
            .await?;
        assert_eq!(res.data, json!({"msg": "hi"}));
        println!("  PASS: {}", res.data);
    }

    println!("Test 2: Body-less shorthands...");
    {
        client.get(format!("{base_url}/extend/get")).await?;
        client.options(format!("{base_url}/extend/options")).await?;
        client.delete(format!("{base_url}/extend/delete")).await?;
        let res = client.head(format!("{base_url}/extend/head")).await?;
        println!("  PASS: HEAD {}", res.status);
    }

    println!("Test 3: Data shorthands...");
    {
        let res = client.post(format!("{base_url}/extend/post"), json!({"msg": "post"})).await?;
        assert_eq!(res.data["msg"], "post");
        let res = client.put(format!("{base_url}/extend/put"), json!({"msg": "put"})).await?;
        assert_eq!(res.data["msg"], "put");
        let res = client.patch(format!("{base_url}/extend/patch"), json!({"msg": "patch"})).await?;
        assert_eq!(res.data["msg"], "patch");
        println!("  PASS: POST/PUT/PATCH echoed their bodies");
    }

    println!("Test 4: Typed response body...");
    {
        let res = client.get(format!("{base_url}/extend/user")).await?;
        let user: ResponseData<User> = res.json()?;
        assert_eq!(user.code, 0);
        assert_eq!(user.result.name, "Alice");
        println!(
            "  PASS: {} -> {} ({})",
            user.message, user.result.name, user.result.age
        );
    }

    println!();
    println!("=== All extend tests passed ===");
    Ok(())
}
