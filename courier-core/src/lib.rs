//! Leaf helpers for the courier HTTP client.
//!
//! This crate holds the plain data transformations the request pipeline
//! relies on but that carry no pipeline logic of their own:
//!
//! - [`url`]: query-string serialization ([`build_url`])
//! - [`headers`]: header normalization, per-method flattening and parsing
//! - [`data`]: JSON payload coercion for request and response bodies
//! - [`error`]: header conversion errors

pub mod data;
mod error;
pub mod headers;
pub mod url;

pub use data::{transform_request_data, transform_response_data};
pub use error::HeaderError;
pub use headers::{
    CONTENT_TYPE, HeaderEntry, Headers, flatten_headers, normalize_header_name, parse_headers,
    process_headers,
};
pub use url::{ParamValue, Params, build_url, encode, serialize_params};
