//! Secret client.
//!
//! Secrets are stored on variable resources and addressed by
//! `(kind, identifier)` within the session's account. Values are bytes and
//! come back exactly as stored.

use crate::{
    authn::Session,
    client::ConjurClient,
    error::{ConjurError, ConjurResult, Operation},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::{Method, header};
use rust_common::PlatformError;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, instrument};

/// Resource kind for ordinary secrets.
pub const VARIABLE_KIND: &str = "variable";

/// Value encoding for batch retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchEncoding {
    /// Values returned as JSON strings; only valid for UTF-8 secrets
    #[default]
    Plain,
    /// Values returned base64-encoded; safe for binary secrets
    Base64,
}

impl ConjurClient {
    /// Store `value` as the current value of a secret.
    ///
    /// Whether storing onto an existing identifier overwrites, adds a
    /// version, or fails is decided by the server; its answer passes through
    /// the error taxonomy unchanged (`409` becomes [`ConjurError::Conflict`]).
    ///
    /// # Errors
    ///
    /// Returns [`ConjurError::Conflict`], [`ConjurError::Auth`],
    /// [`ConjurError::NotFound`] (no such variable resource) or
    /// [`ConjurError::InvalidInput`] as reported by the server.
    #[instrument(skip(self, session, value), fields(account = session.account(), bytes = value.as_ref().len()))]
    pub async fn create_secret(
        &self,
        session: &Session,
        kind: &str,
        identifier: &str,
        value: impl AsRef<[u8]>,
    ) -> ConjurResult<()> {
        let url = self.url(&["secrets", session.account(), kind, identifier])?;
        let request = self
            .authorized(Method::POST, url, session)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(value.as_ref().to_vec());

        self.send(Operation::CreateSecret, request).await?;
        info!("Secret stored");
        Ok(())
    }

    /// Fetch a secret's value, optionally at a specific version.
    ///
    /// # Errors
    ///
    /// Returns [`ConjurError::NotFound`] if the secret or version does not
    /// exist and [`ConjurError::Auth`] if the session may not read it.
    #[instrument(skip(self, session), fields(account = session.account()))]
    pub async fn get_secret(
        &self,
        session: &Session,
        kind: &str,
        identifier: &str,
        version: Option<u32>,
    ) -> ConjurResult<Vec<u8>> {
        let url = self.url(&["secrets", session.account(), kind, identifier])?;
        let url = &url;

        let value = self
            .with_retry(move || async move {
                let mut request = self.authorized(Method::GET, url.clone(), session);
                if let Some(version) = version {
                    request = request.query(&[("version", version)]);
                }
                let response = self.send(Operation::GetSecret, request).await?;
                Ok(response.bytes().await?.to_vec())
            })
            .await?;

        debug!(bytes = value.len(), "Secret retrieved");
        Ok(value)
    }

    /// Fetch several secrets at once.
    ///
    /// `variable_ids` are fully-qualified (`account:variable:identifier`).
    /// The result is keyed the same way.
    ///
    /// # Errors
    ///
    /// Returns [`ConjurError::NotFound`] if any id is missing,
    /// [`ConjurError::Encoding`] if a base64 value does not decode, and a
    /// platform `InvalidInput` error for an empty id list.
    #[instrument(skip(self, session, variable_ids), fields(account = session.account(), count = variable_ids.len()))]
    pub async fn get_secrets<S: AsRef<str>>(
        &self,
        session: &Session,
        variable_ids: &[S],
        encoding: BatchEncoding,
    ) -> ConjurResult<BTreeMap<String, Vec<u8>>> {
        if variable_ids.is_empty() {
            return Err(PlatformError::invalid_input("no variable ids requested").into());
        }

        let url = self.url(&["secrets"])?;
        let url = &url;
        let ids = variable_ids
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join(",");
        let ids = &ids;

        let values: HashMap<String, String> = self
            .with_retry(move || async move {
                let mut request = self
                    .authorized(Method::GET, url.clone(), session)
                    .query(&[("variable_ids", ids)]);
                if encoding == BatchEncoding::Base64 {
                    request = request.header(header::ACCEPT_ENCODING, "base64");
                }
                let response = self.send(Operation::GetSecrets, request).await?;
                Ok(response.json().await?)
            })
            .await?;

        values
            .into_iter()
            .map(|(id, value)| {
                let bytes = match encoding {
                    BatchEncoding::Plain => value.into_bytes(),
                    BatchEncoding::Base64 => STANDARD
                        .decode(value.as_bytes())
                        .map_err(|e| ConjurError::Encoding(format!("{id}: {e}")))?,
                };
                Ok((id, bytes))
            })
            .collect()
    }
}
