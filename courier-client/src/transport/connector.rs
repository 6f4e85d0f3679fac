//! TLS connector setup for the hyper transport.
//!
//! TLS support requires both a crypto provider and root certificates:
//!
//! - **Crypto providers** (choose one): `tls-ring` (default with `tls`) or
//!   `tls-aws-lc`. Without either, a globally installed
//!   `rustls::crypto::CryptoProvider` is used when present.
//! - **Root certificates** (choose one): `tls-native-roots` (default with
//!   `tls`) or `tls-webpki-roots`.

use std::sync::Arc;

use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use rustls::ClientConfig;

use crate::builder::ClientBuildError;

/// Whether both a crypto provider feature and a root certificate feature are
/// enabled.
#[inline]
pub const fn has_tls_support() -> bool {
    cfg!(any(feature = "tls-ring", feature = "tls-aws-lc"))
        && cfg!(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))
}

type ProviderBuilder = rustls::ConfigBuilder<ClientConfig, rustls::WantsVerifier>;

/// Crypto provider from features first, then the process-wide default.
#[allow(unreachable_code)]
fn crypto_provider_builder() -> Result<Option<ProviderBuilder>, rustls::Error> {
    #[cfg(feature = "tls-ring")]
    return ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .map(Some);

    #[cfg(all(feature = "tls-aws-lc", not(feature = "tls-ring")))]
    return ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::aws_lc_rs::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map(Some);

    match rustls::crypto::CryptoProvider::get_default() {
        Some(provider) => ClientConfig::builder_with_provider(Arc::clone(provider))
            .with_safe_default_protocol_versions()
            .map(Some),
        None => Ok(None),
    }
}

/// The default TLS configuration, or `None` without a crypto provider.
#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
pub fn default_tls_config() -> Result<Option<ClientConfig>, ClientBuildError> {
    let builder = crypto_provider_builder().map_err(|e| ClientBuildError::Tls(e.to_string()))?;
    Ok(builder.map(|builder| {
        builder
            .with_root_certificates(build_root_store())
            .with_no_client_auth()
    }))
}

#[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
fn build_root_store() -> rustls::RootCertStore {
    let mut roots = rustls::RootCertStore::empty();

    // Native roots win when both features are enabled.
    #[cfg(feature = "tls-native-roots")]
    {
        let native_certs = rustls_native_certs::load_native_certs();
        if !native_certs.errors.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::debug!("errors loading native certs: {:?}", native_certs.errors);
        }
        roots.add_parsable_certificates(native_certs.certs);
    }

    #[cfg(all(feature = "tls-webpki-roots", not(feature = "tls-native-roots")))]
    {
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    }

    roots
}

/// Build a connector that speaks plain HTTP, and HTTPS when a TLS
/// configuration is available.
///
/// `tls_config` wins over the feature-derived default. With neither, the
/// connector handles `http://` URLs only.
pub fn build_https_connector(
    tls_config: Option<ClientConfig>,
) -> Result<HttpsConnector<HttpConnector>, ClientBuildError> {
    #[cfg(any(feature = "tls-native-roots", feature = "tls-webpki-roots"))]
    let tls_config = match tls_config {
        Some(config) => Some(config),
        None => default_tls_config()?,
    };

    let config = match tls_config {
        Some(config) => config,
        None => {
            let builder = crypto_provider_builder()
                .map_err(|e| ClientBuildError::Tls(e.to_string()))?
                .ok_or_else(|| {
                    ClientBuildError::Tls(
                        "no rustls crypto provider; enable `tls-ring` or `tls-aws-lc`".into(),
                    )
                })?;
            builder
                .with_root_certificates(rustls::RootCertStore::empty())
                .with_no_client_auth()
        }
    };

    Ok(HttpsConnectorBuilder::new()
        .with_tls_config(config)
        .https_or_http()
        .enable_all_versions()
        .wrap_connector(build_http_connector()))
}

/// An HTTP connector that also accepts non-`http` schemes, for wrapping.
fn build_http_connector() -> HttpConnector {
    let mut connector = HttpConnector::new();
    connector.enforce_http(false);
    connector
}
