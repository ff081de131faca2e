//! Centralized HTTP client configuration and building.
//!
//! This module provides a standardized way to create HTTP clients with
//! consistent timeouts and TLS handling: server verification against a
//! supplied CA bundle and optional mutual TLS with a client certificate.

use crate::error::{PlatformError, PlatformResult};
use reqwest::{Certificate, Client, ClientBuilder, Identity};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// TLS settings for outbound connections.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// Verify the server certificate chain (default: true)
    pub verify: bool,
    /// PEM bundle of trusted CA certificates, added to the built-in roots
    pub ca_bundle: Option<PathBuf>,
    /// PEM client certificate for mutual TLS
    pub client_cert: Option<PathBuf>,
    /// PEM private key matching `client_cert`
    pub client_key: Option<PathBuf>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            verify: true,
            ca_bundle: None,
            client_cert: None,
            client_key: None,
        }
    }
}

impl TlsConfig {
    /// Trust the CA certificates in the given PEM bundle.
    #[must_use]
    pub fn with_ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }

    /// Present the given certificate and key for mutual TLS.
    #[must_use]
    pub fn with_client_identity(
        mut self,
        cert: impl Into<PathBuf>,
        key: impl Into<PathBuf>,
    ) -> Self {
        self.client_cert = Some(cert.into());
        self.client_key = Some(key.into());
        self
    }

    /// Disable server certificate verification.
    #[must_use]
    pub const fn without_verification(mut self) -> Self {
        self.verify = false;
        self
    }
}

/// HTTP client configuration.
///
/// Provides sensible defaults for production use with connection pooling,
/// timeouts, and TLS configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout (default: 30s)
    pub timeout: Duration,
    /// Connection timeout (default: 10s)
    pub connect_timeout: Duration,
    /// Pool idle timeout (default: 90s)
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host (default: 10)
    pub pool_max_idle_per_host: usize,
    /// User agent string
    pub user_agent: String,
    /// TLS settings
    pub tls: TlsConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: format!("conjur-rust/{}", env!("CARGO_PKG_VERSION")),
            tls: TlsConfig::default(),
        }
    }
}

impl HttpConfig {
    /// Create a new HTTP config with custom timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create a new HTTP config with custom connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Create a new HTTP config with custom user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Create a new HTTP config with custom TLS settings.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }
}

fn read_pem(path: &Path) -> PlatformResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| PlatformError::tls(format!("{}: {e}", path.display())))
}

fn load_ca_bundle(path: &Path) -> PlatformResult<Vec<Certificate>> {
    let pem = read_pem(path)?;
    let certs = Certificate::from_pem_bundle(&pem)
        .map_err(|e| PlatformError::tls(format!("{}: {e}", path.display())))?;
    if certs.is_empty() {
        return Err(PlatformError::tls(format!(
            "{}: no certificates found",
            path.display()
        )));
    }
    Ok(certs)
}

fn load_identity(cert: &Path, key: &Path) -> PlatformResult<Identity> {
    let mut pem = read_pem(cert)?;
    pem.push(b'\n');
    pem.extend(read_pem(key)?);
    Identity::from_pem(&pem).map_err(|e| {
        PlatformError::tls(format!(
            "client identity {} / {}: {e}",
            cert.display(),
            key.display()
        ))
    })
}

/// Build a configured HTTP client.
///
/// Creates a reqwest client with rustls TLS, connection pooling, and
/// the specified configuration.
///
/// # Errors
///
/// Returns [`PlatformError::Tls`] if certificate material cannot be read or
/// parsed, [`PlatformError::InvalidInput`] if only one half of the client
/// identity is configured, and [`PlatformError::Http`] if the client cannot
/// be built.
///
/// # Examples
///
/// ```
/// use rust_common::{HttpConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default()
///     .with_timeout(Duration::from_secs(60));
/// let client = build_http_client(&config).expect("Failed to build client");
/// ```
pub fn build_http_client(config: &HttpConfig) -> PlatformResult<Client> {
    let mut builder = ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .pool_idle_timeout(config.pool_idle_timeout)
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .user_agent(&config.user_agent)
        .use_rustls_tls();

    let tls = &config.tls;
    if let Some(ca) = &tls.ca_bundle {
        for cert in load_ca_bundle(ca)? {
            builder = builder.add_root_certificate(cert);
        }
        debug!(ca_bundle = %ca.display(), "Loaded CA bundle");
    }

    match (&tls.client_cert, &tls.client_key) {
        (Some(cert), Some(key)) => {
            builder = builder.identity(load_identity(cert, key)?);
            debug!(client_cert = %cert.display(), "Configured mutual TLS identity");
        }
        (None, None) => {}
        _ => {
            return Err(PlatformError::invalid_input(
                "client certificate and key must be configured together",
            ));
        }
    }

    if !tls.verify {
        warn!("Server certificate verification is disabled");
        builder = builder.danger_accept_invalid_certs(true);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.pool_max_idle_per_host, 10);
        assert!(config.tls.verify);
        assert!(config.user_agent.starts_with("conjur-rust/"));
    }

    #[test]
    fn test_config_builder() {
        let config = HttpConfig::default()
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("test-agent")
            .with_tls(TlsConfig::default().with_ca_bundle("/config/https/ca.crt"));

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(
            config.tls.ca_bundle.as_deref(),
            Some(Path::new("/config/https/ca.crt"))
        );
    }

    #[test]
    fn test_build_client() {
        let config = HttpConfig::default();
        let result = build_http_client(&config);
        assert!(result.is_ok());
    }

    #[test]
    fn test_missing_ca_bundle_is_tls_error() {
        let config = HttpConfig::default()
            .with_tls(TlsConfig::default().with_ca_bundle("/nonexistent/ca.crt"));
        let err = build_http_client(&config).unwrap_err();
        assert!(matches!(err, PlatformError::Tls(_)));
        assert!(err.to_string().contains("/nonexistent/ca.crt"));
    }

    #[test]
    fn test_ca_bundle_without_certificates_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not a certificate").unwrap();

        let config =
            HttpConfig::default().with_tls(TlsConfig::default().with_ca_bundle(file.path()));
        let err = build_http_client(&config).unwrap_err();
        assert!(matches!(err, PlatformError::Tls(_)));
    }

    #[test]
    fn test_half_configured_identity_is_rejected() {
        let mut tls = TlsConfig::default();
        tls.client_cert = Some(PathBuf::from("/config/https/conjur.crt"));

        let err = build_http_client(&HttpConfig::default().with_tls(tls)).unwrap_err();
        assert!(matches!(err, PlatformError::InvalidInput(_)));
    }

    #[test]
    fn test_unverified_client_builds() {
        let config = HttpConfig::default().with_tls(TlsConfig::default().without_verification());
        assert!(build_http_client(&config).is_ok());
    }
}
