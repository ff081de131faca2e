//! Conjur client configuration.

use crate::error::{ConjurError, ConjurResult};
use rust_common::{HttpConfig, RetryConfig, TlsConfig};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_HOST: &str = "https://conjur-https";
const DEFAULT_CERT_DIR: &str = "config/https";
const DEFAULT_CA_FILE: &str = "ca.crt";

/// Conjur client configuration.
#[derive(Debug, Clone)]
pub struct ConjurConfig {
    /// Conjur appliance URL
    pub host: String,
    /// Transport settings, including TLS material
    pub http: HttpConfig,
    /// Retry settings for idempotent reads
    pub retry: RetryConfig,
}

impl Default for ConjurConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST)
    }
}

impl ConjurConfig {
    /// Create a new configuration with default transport settings and
    /// retries disabled.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            http: HttpConfig::default(),
            retry: RetryConfig::disabled(),
        }
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConjurError::Config`] if a numeric or boolean variable
    /// cannot be parsed.
    pub fn from_env() -> ConjurResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// The CA bundle is `CERT_DIR/SSL_CERT_FILE`; it is used when either
    /// variable is set or the default path exists. A client identity is
    /// configured only when both `CONJUR_CERT_FILE` and `CONJUR_KEY_FILE`
    /// are set and both files exist; relative paths resolve against
    /// `CERT_DIR`.
    ///
    /// # Errors
    ///
    /// Returns [`ConjurError::Config`] if a numeric or boolean variable
    /// cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> ConjurResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("CONJUR_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let cert_dir_var = lookup("CERT_DIR");
        let ca_file_var = lookup("SSL_CERT_FILE");
        let explicit_ca = cert_dir_var.is_some() || ca_file_var.is_some();
        let cert_dir = PathBuf::from(cert_dir_var.unwrap_or_else(|| DEFAULT_CERT_DIR.to_string()));
        let ca_bundle = cert_dir.join(ca_file_var.unwrap_or_else(|| DEFAULT_CA_FILE.to_string()));

        let mut tls = TlsConfig::default();
        if explicit_ca || ca_bundle.exists() {
            tls = tls.with_ca_bundle(ca_bundle);
        }
        if let (Some(cert), Some(key)) = (lookup("CONJUR_CERT_FILE"), lookup("CONJUR_KEY_FILE")) {
            let (cert, key) = (cert_dir.join(cert), cert_dir.join(key));
            if cert.exists() && key.exists() {
                tls = tls.with_client_identity(cert, key);
            }
        }
        if !parse_var(&lookup, "CONJUR_VERIFY_SSL", true)? {
            tls = tls.without_verification();
        }

        let timeout = Duration::from_secs(parse_var(&lookup, "CONJUR_TIMEOUT_SECS", 30)?);
        let max_retries = parse_var(&lookup, "CONJUR_MAX_RETRIES", 0)?;

        Ok(Self {
            host,
            http: HttpConfig::default().with_timeout(timeout).with_tls(tls),
            retry: RetryConfig::default().with_max_retries(max_retries),
        })
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout = timeout;
        self
    }

    /// Set TLS settings.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.http.tls = tls;
        self
    }

    /// Set retry settings for idempotent reads.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> ConjurResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConjurError::config(format!("Invalid {key}={raw}: {e}"))),
        None => Ok(default),
    }
}
