//! Completed responses.

use courier_core::{HeaderEntry, Headers};
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::RequestConfig;
use crate::error::HttpError;
use crate::transport::TransportHandle;

/// The result of a completed request.
#[derive(Clone, Debug)]
pub struct Response {
    /// The body after the response transforms ran.
    pub data: Value,
    pub status: StatusCode,
    pub status_text: String,
    /// Flat headers keyed by lower-cased name.
    pub headers: Headers,
    /// The effective configuration that produced this response.
    pub config: RequestConfig,
    /// Raw transport handle.
    pub request: TransportHandle,
}

impl Response {
    /// Look up a response header by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get_ignore_case(name)
            .and_then(HeaderEntry::as_str)
    }

    /// Deserialize `data` into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        T::deserialize(&self.data)
            .map_err(|e| HttpError::transform(format!("failed to decode response data: {e}")))
    }

    /// Whether the status is in `[200, 300)`.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn response(data: Value) -> Response {
        Response {
            data,
            status: StatusCode::OK,
            status_text: "OK".into(),
            headers: Headers::new().with("content-type", "application/json"),
            config: RequestConfig::new(),
            request: TransportHandle::new(()),
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
        age: u32,
    }

    #[test]
    fn test_json_decodes_data() {
        let res = response(json!({"name": "ann", "age": 18}));
        let user: User = res.json().unwrap();
        assert_eq!(user, User { name: "ann".into(), age: 18 });
    }

    #[test]
    fn test_json_mismatch_is_transform_error() {
        let res = response(json!("plain text"));
        let err = res.json::<User>().unwrap_err();
        assert!(err.message().starts_with("failed to decode response data"));
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let res = response(Value::Null);
        assert_eq!(res.header("Content-Type"), Some("application/json"));
        assert!(res.is_success());
    }
}
