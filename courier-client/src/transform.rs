//! Request and response body transforms.
//!
//! A [`Transform`] maps a body value to a new one and may write to the
//! headers as it goes; that header write is how the default request
//! transform asserts a JSON content type.

use std::fmt;
use std::sync::Arc;

use courier_core::{Headers, process_headers, transform_request_data, transform_response_data};
use serde_json::Value;

use crate::error::HttpError;

type TransformFn = dyn Fn(Value, &mut Headers) -> Result<Value, HttpError> + Send + Sync;

/// A single body transform.
#[derive(Clone)]
pub struct Transform(Arc<TransformFn>);

impl Transform {
    /// Wrap a fallible transform function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value, &mut Headers) -> Result<Value, HttpError> + Send + Sync + 'static,
    {
        Transform(Arc::new(f))
    }

    /// Wrap an infallible transform that ignores headers.
    pub fn map<F>(f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        Transform::new(move |data, _| Ok(f(data)))
    }

    pub fn apply(&self, data: Value, headers: &mut Headers) -> Result<Value, HttpError> {
        (self.0)(data, headers)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transform").finish_non_exhaustive()
    }
}

/// Thread `data` through `transforms` in order.
///
/// With no transform list the data is returned unchanged. The first failing
/// transform stops the pipeline.
pub fn transform(
    data: Value,
    headers: &mut Headers,
    transforms: Option<&[Transform]>,
) -> Result<Value, HttpError> {
    let Some(transforms) = transforms else {
        return Ok(data);
    };
    transforms
        .iter()
        .try_fold(data, |data, transform| transform.apply(data, headers))
}

/// Normalize `Content-Type`, default it for JSON objects, then serialize
/// objects to JSON text.
pub fn default_request_transform() -> Transform {
    Transform::new(|data, headers| {
        process_headers(headers, &data);
        Ok(transform_request_data(data))
    })
}

/// Decode string bodies that hold JSON; anything else passes through.
pub fn default_response_transform() -> Transform {
    Transform::map(transform_response_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::{CONTENT_TYPE, HeaderEntry};
    use serde_json::json;

    #[test]
    fn test_no_transforms_returns_data() {
        let mut headers = Headers::new();
        let data = transform(json!({"a": 1}), &mut headers, None).unwrap();
        assert_eq!(data, json!({"a": 1}));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_transforms_apply_in_order() {
        let append = |suffix: &'static str| {
            Transform::map(move |data| {
                json!(format!("{}{}", data.as_str().unwrap_or_default(), suffix))
            })
        };
        let transforms = vec![append("a"), append("b"), append("c")];
        let mut headers = Headers::new();
        let data = transform(json!(""), &mut headers, Some(transforms.as_slice())).unwrap();
        assert_eq!(data, json!("abc"));
    }

    #[test]
    fn test_transform_may_write_headers() {
        let tag = Transform::new(|data, headers| {
            headers.insert("X-Tagged", "yes");
            Ok(data)
        });
        let mut headers = Headers::new();
        transform(Value::Null, &mut headers, Some(&[tag][..])).unwrap();
        assert_eq!(headers.get("X-Tagged").and_then(HeaderEntry::as_str), Some("yes"));
    }

    #[test]
    fn test_failing_transform_stops_pipeline() {
        let fail = Transform::new(|_, _| Err(HttpError::transform("boom")));
        let unreachable = Transform::new(|_, headers| {
            headers.insert("X-Ran", "1");
            Ok(Value::Null)
        });
        let mut headers = Headers::new();
        let err = transform(json!(1), &mut headers, Some(&[fail, unreachable][..])).unwrap_err();
        assert_eq!(err.message(), "boom");
        assert!(!headers.contains("X-Ran"));
    }

    #[test]
    fn test_default_request_transform() {
        let mut headers = Headers::new();
        let data = default_request_transform()
            .apply(json!({"a": 1}), &mut headers)
            .unwrap();
        assert_eq!(data, json!(r#"{"a":1}"#));
        assert_eq!(
            headers.get(CONTENT_TYPE).and_then(HeaderEntry::as_str),
            Some("application/json;charset=utf-8")
        );
    }

    #[test]
    fn test_default_response_transform() {
        let mut headers = Headers::new();
        let transform = default_response_transform();
        assert_eq!(
            transform.apply(json!(r#"{"v":1}"#), &mut headers).unwrap(),
            json!({"v": 1})
        );
        assert_eq!(
            transform.apply(json!("hello "), &mut headers).unwrap(),
            json!("hello ")
        );
    }
}
