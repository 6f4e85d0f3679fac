//! Client builder.
//!
//! Provides a fluent API for configuring and building a [`Client`].

use std::sync::Arc;
use std::time::Duration;

use courier_core::HeaderEntry;

use crate::client::Client;
use crate::config::RequestConfig;
use crate::transport::{HyperTransport, Transport};

/// Builder for creating a [`Client`].
///
/// # Example
///
/// ```ignore
/// use courier_client::ClientBuilder;
/// use std::time::Duration;
///
/// let client = ClientBuilder::new()
///     .timeout(Duration::from_secs(5))
///     .header("X-Requested-With", "XMLHttpRequest")
///     .build()?;
/// ```
pub struct ClientBuilder {
    /// Custom transport; the hyper transport when unset.
    transport: Option<Arc<dyn Transport>>,
    /// Defaults every request is merged over.
    defaults: RequestConfig,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("transport", &self.transport.is_some())
            .field("defaults", &self.defaults)
            .finish()
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Start from the library defaults.
    pub fn new() -> Self {
        Self {
            transport: None,
            defaults: RequestConfig::defaults(),
        }
    }

    /// Use a custom transport.
    pub fn transport<T: Transport>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Replace the defaults entirely, dropping the library defaults.
    pub fn defaults(mut self, defaults: RequestConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Merge `overrides` over the current defaults.
    pub fn merge_defaults(mut self, overrides: RequestConfig) -> Self {
        self.defaults = crate::config::merge_config(&self.defaults, &overrides);
        self
    }

    /// Default timeout for every request. Zero disables it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.defaults.timeout = Some(timeout);
        self
    }

    /// Add a header sent with every request, whatever the method.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<HeaderEntry>) -> Self {
        self.defaults = self.defaults.group_header("common", name, value);
        self
    }

    pub fn build(self) -> Result<Client, ClientBuildError> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HyperTransport::new()?),
        };
        Ok(Client::from_parts(transport, self.defaults))
    }
}

/// Error type for client building.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientBuildError {
    /// Failed to set up TLS for the default transport.
    #[error("failed to configure TLS: {0}")]
    Tls(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::HeaderEntry;

    #[test]
    fn test_builder_defaults() {
        let builder = ClientBuilder::new();
        assert!(builder.transport.is_none());
        assert_eq!(builder.defaults.method, Some(http::Method::GET));
    }

    #[test]
    fn test_builder_timeout_and_header() {
        let builder = ClientBuilder::new()
            .timeout(Duration::from_secs(5))
            .header("X-Requested-With", "XMLHttpRequest");
        assert_eq!(builder.defaults.timeout, Some(Duration::from_secs(5)));

        let headers = builder.defaults.headers.unwrap();
        let common = headers.group("common").unwrap();
        assert_eq!(
            common.get("X-Requested-With"),
            Some(&HeaderEntry::Value("XMLHttpRequest".into()))
        );
        assert!(common.contains("Accept"));
    }

    #[test]
    fn test_merge_defaults_keeps_library_defaults() {
        let builder =
            ClientBuilder::new().merge_defaults(RequestConfig::new().extension("tag", "x"));
        assert!(builder.defaults.transform_request.is_some());
        assert_eq!(builder.defaults.extensions.get("tag"), Some(&"x".into()));
    }

    #[cfg(all(feature = "tls-ring", feature = "tls-native-roots"))]
    #[test]
    fn test_build_with_default_transport() {
        assert!(ClientBuilder::new().build().is_ok());
    }
}
