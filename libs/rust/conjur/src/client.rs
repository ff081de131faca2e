//! Conjur HTTP client.
//!
//! Holds the transport and base URL. Operations live in the `authn`,
//! `policy`, `secrets` and `roles` modules as further `impl` blocks; every
//! call takes its credentials or session explicitly.

use crate::{
    authn::Session,
    config::ConjurConfig,
    credentials::Credentials,
    error::{ConjurError, ConjurResult, Operation},
};
use reqwest::{Client, Method, RequestBuilder, Response, header};
use rust_common::{RetryPolicy, build_http_client};
use tracing::{debug, warn};
use url::Url;

/// Client for one Conjur appliance.
#[derive(Debug, Clone)]
pub struct ConjurClient {
    config: ConjurConfig,
    http: Client,
    base_url: Url,
    retry: RetryPolicy,
}

impl ConjurClient {
    /// Create a new Conjur client.
    ///
    /// # Errors
    ///
    /// Returns [`ConjurError::Config`] if the host is not an absolute URL,
    /// or a platform error if TLS material cannot be loaded.
    pub fn new(config: ConjurConfig) -> ConjurResult<Self> {
        let base_url = Url::parse(config.host.trim_end_matches('/'))
            .map_err(|e| ConjurError::config(format!("Invalid host {}: {e}", config.host)))?;
        if base_url.cannot_be_a_base() {
            return Err(ConjurError::config(format!(
                "Invalid host {}: not a base URL",
                config.host
            )));
        }

        let http = build_http_client(&config.http)?;
        let retry = RetryPolicy::new(config.retry.clone());

        debug!(host = %base_url, "Created Conjur client");
        Ok(Self {
            config,
            http,
            base_url,
            retry,
        })
    }

    /// Configuration this client was built from.
    #[must_use]
    pub const fn config(&self) -> &ConjurConfig {
        &self.config
    }

    /// Build an endpoint URL, percent-encoding each segment (`/` included).
    pub(crate) fn url(&self, segments: &[&str]) -> ConjurResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ConjurError::Encoding(format!("cannot extend {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Request authorized with the role's login and password/API key.
    pub(crate) fn basic(&self, method: Method, url: Url, credentials: &Credentials) -> RequestBuilder {
        self.http
            .request(method, url)
            .basic_auth(credentials.login(), Some(credentials.basic_auth_password()))
    }

    /// Request authorized with a session's access token.
    pub(crate) fn authorized(&self, method: Method, url: Url, session: &Session) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(header::AUTHORIZATION, session.authorization_header())
    }

    /// Request with no authorization header.
    pub(crate) fn anonymous(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url)
    }

    /// Send a request and classify any non-success status.
    pub(crate) async fn send(
        &self,
        operation: Operation,
        request: RequestBuilder,
    ) -> ConjurResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| ConjurError::unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(operation = operation.as_str(), status = status.as_u16(), "Conjur request succeeded");
            return Ok(response);
        }

        let detail = response.text().await.unwrap_or_default();
        warn!(operation = operation.as_str(), status = status.as_u16(), "Conjur request failed");
        Err(ConjurError::from_response(operation, status, detail))
    }

    /// Run an idempotent read under the configured retry policy.
    pub(crate) async fn with_retry<F, Fut, T>(&self, operation: F) -> ConjurResult<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = ConjurResult<T>>,
    {
        self.retry.execute(operation).await
    }
}
