//! Policy loader.
//!
//! Policy documents are submitted verbatim. The server answers with the
//! roles the load *created*, each with its freshly generated API key.
//!
//! # Re-running a load
//!
//! `created_roles` only lists roles that did not exist before this load. If
//! a role survives from an earlier run, it is silently absent from the
//! result. To observe every intended creation deterministically, first
//! submit an empty policy under the same identifier in
//! [`PolicyMode::Replace`] mode, which removes the roles left by earlier
//! runs, then load the full document:
//!
//! ```no_run
//! # async fn run(client: &conjur_client::ConjurClient, session: &conjur_client::Session)
//! # -> conjur_client::ConjurResult<()> {
//! use conjur_client::PolicyMode;
//!
//! client.apply_policy(session, PolicyMode::Replace, "root", "---\n").await?;
//! let loaded = client.load_policy(session, "root", "- !user alice\n").await?;
//! assert!(loaded.created_role("dev:user:alice").is_some());
//! # Ok(())
//! # }
//! ```

use crate::{
    authn::Session,
    client::ConjurClient,
    error::{ConjurResult, Operation},
    roles::RoleId,
};
use reqwest::{Method, header};
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// How a policy document is applied to the existing policy branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyMode {
    /// Add the document's records; never deletes (POST)
    #[default]
    Load,
    /// Replace the branch with the document; records not in it are deleted (PUT)
    Replace,
    /// Apply additions, changes and explicit deletions (PATCH)
    Update,
}

impl PolicyMode {
    const fn method(self) -> Method {
        match self {
            Self::Load => Method::POST,
            Self::Replace => Method::PUT,
            Self::Update => Method::PATCH,
        }
    }
}

/// A role created by a policy load.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedRole {
    /// Fully-qualified role id, `account:kind:identifier`
    pub id: String,
    /// The role's generated API key
    pub api_key: SecretString,
}

/// Server response to a policy submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyLoadResult {
    /// Roles created by this load, keyed by fully-qualified id
    #[serde(default)]
    pub created_roles: BTreeMap<String, CreatedRole>,
    /// Policy version after the load
    #[serde(default)]
    pub version: Option<u64>,
}

impl PolicyLoadResult {
    /// Look up a created role by its fully-qualified (`dev:user:alice`) or
    /// account-relative (`user:alice`) id.
    #[must_use]
    pub fn created_role(&self, id: &str) -> Option<&CreatedRole> {
        self.created_roles.get(id).or_else(|| {
            self.created_roles
                .iter()
                .find(|(qualified, _)| {
                    qualified
                        .split_once(':')
                        .is_some_and(|(_, relative)| relative == id)
                })
                .map(|(_, role)| role)
        })
    }

    /// The generated API key of `role` in `account`, if this load created it.
    #[must_use]
    pub fn api_key_for(&self, account: &str, role: &RoleId) -> Option<&SecretString> {
        self.created_role(&role.qualified(account))
            .map(|created| &created.api_key)
    }
}

impl ConjurClient {
    /// Submit a policy document under `identifier` using `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConjurError::Policy`] with the server's response body
    /// unmodified for malformed documents or insufficient privilege, and
    /// [`crate::ConjurError::Auth`] if the token is rejected.
    #[instrument(skip(self, session, document), fields(account = session.account(), bytes = document.len()))]
    pub async fn apply_policy(
        &self,
        session: &Session,
        mode: PolicyMode,
        identifier: &str,
        document: &str,
    ) -> ConjurResult<PolicyLoadResult> {
        let url = self.url(&["policies", session.account(), "policy", identifier])?;
        let request = self
            .authorized(mode.method(), url, session)
            .header(header::CONTENT_TYPE, "text/plain")
            .body(document.to_owned());

        let response = self.send(Operation::ApplyPolicy, request).await?;
        let body = response.bytes().await?;
        let result: PolicyLoadResult = if body.is_empty() {
            PolicyLoadResult::default()
        } else {
            serde_json::from_slice(&body)?
        };

        info!(
            created = result.created_roles.len(),
            version = result.version,
            "Policy applied"
        );
        Ok(result)
    }

    /// Add a policy document to the branch `identifier` (POST).
    ///
    /// Only roles created by this call are reported; see the module docs
    /// for the empty-then-full pattern that makes re-runs deterministic.
    ///
    /// # Errors
    ///
    /// See [`ConjurClient::apply_policy`].
    pub async fn load_policy(
        &self,
        session: &Session,
        identifier: &str,
        document: &str,
    ) -> ConjurResult<PolicyLoadResult> {
        self.apply_policy(session, PolicyMode::Load, identifier, document)
            .await
    }

    /// Replace the branch `identifier` with a policy document (PUT).
    ///
    /// # Errors
    ///
    /// See [`ConjurClient::apply_policy`].
    pub async fn replace_policy(
        &self,
        session: &Session,
        identifier: &str,
        document: &str,
    ) -> ConjurResult<PolicyLoadResult> {
        self.apply_policy(session, PolicyMode::Replace, identifier, document)
            .await
    }

    /// Modify the branch `identifier` with a policy document (PATCH).
    ///
    /// # Errors
    ///
    /// See [`ConjurClient::apply_policy`].
    pub async fn update_policy(
        &self,
        session: &Session,
        identifier: &str,
        document: &str,
    ) -> ConjurResult<PolicyLoadResult> {
        self.apply_policy(session, PolicyMode::Update, identifier, document)
            .await
    }
}
