//! Error types for header conversion.

/// Errors raised while turning a [`Headers`](crate::Headers) mapping into
/// wire-level `http` header types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    /// The header name is not a valid HTTP token.
    #[error("invalid header name: {0}")]
    InvalidName(String),

    /// The header value contains bytes that cannot appear on the wire.
    #[error("invalid value for header {name}: {value:?}")]
    InvalidValue { name: String, value: String },
}

impl HeaderError {
    /// Name of the offending header.
    pub fn name(&self) -> &str {
        match self {
            HeaderError::InvalidName(name) => name,
            HeaderError::InvalidValue { name, .. } => name,
        }
    }
}
