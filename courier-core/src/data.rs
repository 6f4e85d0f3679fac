//! JSON payload coercion for request and response bodies.

use serde_json::Value;

/// Serialize JSON object bodies to JSON text; every other value passes through.
pub fn transform_request_data(data: Value) -> Value {
    match data {
        Value::Object(_) => Value::String(data.to_string()),
        other => other,
    }
}

/// Decode string bodies as JSON when possible, keeping the text otherwise.
pub fn transform_response_data(data: Value) -> Value {
    match data {
        Value::String(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_object_becomes_json_text() {
        let out = transform_request_data(json!({"a": 1}));
        assert_eq!(out, Value::String(r#"{"a":1}"#.to_string()));
    }

    #[test]
    fn test_request_other_values_pass_through() {
        assert_eq!(transform_request_data(json!([1, 2])), json!([1, 2]));
        assert_eq!(transform_request_data(json!("a=1")), json!("a=1"));
        assert_eq!(transform_request_data(Value::Null), Value::Null);
    }

    #[test]
    fn test_response_json_text_is_decoded() {
        assert_eq!(transform_response_data(json!(r#"{"v":1}"#)), json!({"v": 1}));
    }

    #[test]
    fn test_response_plain_text_is_kept() {
        assert_eq!(transform_response_data(json!("hello ")), json!("hello "));
        assert_eq!(transform_response_data(json!({"v": 1})), json!({"v": 1}));
    }
}
