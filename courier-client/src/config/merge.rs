//! Field-wise merging of a base config with an override.

use courier_core::Headers;
use serde_json::Map;

use super::RequestConfig;

/// Override when present, otherwise base.
fn prefer<T: Clone>(base: &Option<T>, over: &Option<T>) -> Option<T> {
    over.as_ref().or(base.as_ref()).cloned()
}

/// Strategy for the per-request fields `url`, `params` and `data`: the
/// override when present, else the base carried unchanged.
fn override_or_absent<T: Clone>(base: &Option<T>, over: &Option<T>) -> Option<T> {
    match over {
        Some(value) => Some(value.clone()),
        None => base.clone(),
    }
}

/// Recursive header merge; a lone base is copied through the same merge so
/// the result never aliases an input.
fn deep_merge_headers(base: &Option<Headers>, over: &Option<Headers>) -> Option<Headers> {
    match (base, over) {
        (None, None) => None,
        (Some(base), None) => Some(Headers::deep_merge(&[base])),
        (None, Some(over)) => Some(Headers::deep_merge(&[over])),
        (Some(base), Some(over)) => Some(Headers::deep_merge(&[base, over])),
    }
}

/// Merge `over` on top of `base` into a fresh config.
///
/// - `headers` merge recursively; override leaves win.
/// - `url`, `params` and `data` take the override when present and otherwise
///   carry the base value unchanged.
/// - Every other field, and each extension key, takes the override when
///   present and otherwise the base.
///
/// Neither input is modified.
pub fn merge_config(base: &RequestConfig, over: &RequestConfig) -> RequestConfig {
    let mut extensions = Map::with_capacity(base.extensions.len() + over.extensions.len());
    for (key, value) in base.extensions.iter().chain(over.extensions.iter()) {
        extensions.insert(key.clone(), value.clone());
    }

    RequestConfig {
        url: override_or_absent(&base.url, &over.url),
        params: override_or_absent(&base.params, &over.params),
        data: override_or_absent(&base.data, &over.data),
        headers: deep_merge_headers(&base.headers, &over.headers),
        method: prefer(&base.method, &over.method),
        timeout: prefer(&base.timeout, &over.timeout),
        response_type: prefer(&base.response_type, &over.response_type),
        with_credentials: prefer(&base.with_credentials, &over.with_credentials),
        cancel_token: prefer(&base.cancel_token, &over.cancel_token),
        transform_request: prefer(&base.transform_request, &over.transform_request),
        transform_response: prefer(&base.transform_response, &over.transform_response),
        extensions,
    }
}
