//! Per-instance defaults and transforms via `Client::create`.
//!
//! The instance form-encodes request objects and tags response objects with
//! `b = 2`.
//!
//! Usage:
//!   cargo run --bin server
//!   cargo run --bin config-client [-- http://localhost:8080]

use courier_client::config::DEFAULT_FORM_CONTENT_TYPE;
use courier_client::{
    Client, HttpError, Params, RequestConfig, Transform, default_request_transform,
    default_response_transform, serialize_params,
};
use serde_json::{Value, json};

fn form_encode() -> Transform {
    Transform::new(|data, headers| match data {
        Value::Object(map) => {
            headers.insert("Content-Type", DEFAULT_FORM_CONTENT_TYPE);
            let params: Params = map.into_iter().collect();
            Ok(Value::String(serialize_params(&params)))
        }
        other => Ok(other),
    })
}

fn tag_response() -> Transform {
    Transform::new(|data, _| match data {
        Value::Object(mut map) => {
            map.insert("b".into(), json!(2));
            Ok(Value::Object(map))
        }
        Value::Null => Err(HttpError::transform("empty response body")),
        other => Ok(other),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    courier_examples::init_tracing();
    let base_url = courier_examples::server_url();
    let client = Client::new()?;

    println!("=== Config Client ===");
    println!("Server URL: {}", base_url);
    println!();

    println!("Test 1: Instance with custom transforms...");
    {
        let instance = client.create(
            RequestConfig::new()
                .transform_request(vec![form_encode()])
                .transform_response(vec![default_response_transform(), tag_response()]),
        );

        let res = instance
            .post(format!("{base_url}/config/post"), json!({"a": 1}))
            .await?;
        assert_eq!(res.data, json!({"a": "1", "b": 2}));
        println!("  PASS: {}", res.data);
    }

    println!("Test 2: The parent client keeps its defaults...");
    {
        let res = client
            .post(format!("{base_url}/config/post"), json!({"a": 1}))
            .await?;
        assert_eq!(res.data, json!({"a": 1}));
        println!("  PASS: {}", res.data);
    }

    println!("Test 3: Appending to the default request transforms...");
    {
        let res = client
            .post_with(
                format!("{base_url}/config/post"),
                json!({"a": 1}),
                RequestConfig::new().transform_request(vec![
                    Transform::map(|data| match data {
                        Value::Object(mut map) => {
                            map.insert("extra".into(), json!(true));
                            Value::Object(map)
                        }
                        other => other,
                    }),
                    default_request_transform(),
                ]),
            )
            .await?;
        assert_eq!(res.data, json!({"a": 1, "extra": true}));
        println!("  PASS: {}", res.data);
    }

    println!();
    println!("=== All config tests passed ===");
    Ok(())
}
