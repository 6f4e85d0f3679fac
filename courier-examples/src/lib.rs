//! Shared helpers for the courier demo binaries.

use std::env;

/// Default address of the demo server.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

/// Server URL from the first CLI argument, then `SERVER_URL`, then the default.
pub fn server_url() -> String {
    env::args()
        .nth(1)
        .or_else(|| env::var("SERVER_URL").ok())
        .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string())
}

/// Install a `fmt` subscriber filtered by `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
