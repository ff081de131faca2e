//! The end-to-end workflow.
//!
//! Stages run strictly in order and the first failure aborts the run.
//! Each stage writes a progress line to the output; diagnostics go through
//! `tracing`.

use crate::{
    config::WorkflowConfig,
    error::{Stage, WorkflowError, failed},
};
use conjur_client::{AccessToken, ConjurClient, PolicyMode, TokenEncoding, VARIABLE_KIND};
use secrecy::{ExposeSecret, SecretString};
use std::io::Write;
use tracing::{info, instrument, warn};

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct WorkflowReport {
    /// Access token of the admin session
    pub token: AccessToken,
    /// Policy version after the full load
    pub policy_version: Option<u64>,
    /// Key the role was created with
    pub created_api_key: SecretString,
    /// Key after rotation
    pub rotated_api_key: SecretString,
    /// Value read back from the secret
    pub secret: Vec<u8>,
}

/// Workflow runner.
#[derive(Debug, Clone)]
pub struct Workflow {
    client: ConjurClient,
    config: WorkflowConfig,
}

impl Workflow {
    /// Build a workflow and its Conjur client.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Client`] if the client cannot be built.
    pub fn new(config: WorkflowConfig) -> Result<Self, WorkflowError> {
        let client = ConjurClient::new(config.conjur.clone())?;
        Ok(Self { client, config })
    }

    /// Run all stages, reporting progress on stdout.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure.
    pub async fn run(&self) -> Result<WorkflowReport, WorkflowError> {
        self.run_with_output(&mut std::io::stdout()).await
    }

    /// Run all stages, reporting progress to `out`.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure; a mismatching read-back is
    /// [`WorkflowError::SecretMalformed`] after "Secret Malformed" is written.
    #[instrument(skip(self, out), fields(account = self.config.credentials.account()))]
    pub async fn run_with_output<W: Write>(&self, out: &mut W) -> Result<WorkflowReport, WorkflowError> {
        let config = &self.config;
        let client = &self.client;
        let mut credentials = config.credentials.clone();

        writeln!(out, "Authenticating {}...", credentials.login())?;
        let session = client
            .authenticate(&credentials, TokenEncoding::Base64)
            .await
            .map_err(failed(Stage::Authenticate))?;
        writeln!(out, "Base64 encoded token: {}", session.token().expose())?;

        writeln!(out, "\nChanging {} password...", credentials.login())?;
        client
            .change_password(&mut credentials, config.new_password.clone())
            .await
            .map_err(failed(Stage::ChangePassword))?;
        writeln!(out, "Password change successful.")?;

        writeln!(out, "\nLoading empty {} policy...", config.policy_id)?;
        client
            .apply_policy(&session, PolicyMode::Replace, &config.policy_id, &config.empty_policy)
            .await
            .map_err(failed(Stage::LoadEmptyPolicy))?;
        writeln!(out, "Empty policy loaded.")?;

        writeln!(out, "\nLoading {} policy...", config.policy_id)?;
        let loaded = client
            .load_policy(&session, &config.policy_id, &config.policy)
            .await
            .map_err(failed(Stage::LoadPolicy))?;
        writeln!(out, "Policy loaded.")?;

        let created_api_key = loaded
            .api_key_for(session.account(), &config.rotate_role)
            .cloned()
            .ok_or_else(|| {
                WorkflowError::MissingCreatedRole(config.rotate_role.qualified(session.account()))
            })?;
        writeln!(
            out,
            "{} API key: {}",
            config.rotate_role,
            created_api_key.expose_secret()
        )?;

        writeln!(out, "\nRotating {} API key...", config.rotate_role)?;
        let rotated_api_key = client
            .rotate_api_key(&session, &config.rotate_role)
            .await
            .map_err(failed(Stage::RotateApiKey))?;
        writeln!(out, "New API key: {}", rotated_api_key.expose_secret())?;

        let expected = config.secret_value.expose_secret().as_bytes();
        writeln!(out, "\nStoring secret...")?;
        writeln!(out, "Secret data: {}", config.secret_value.expose_secret())?;
        client
            .create_secret(&session, VARIABLE_KIND, &config.secret_id, expected)
            .await
            .map_err(failed(Stage::StoreSecret))?;
        writeln!(out, "Secret stored.")?;

        writeln!(out, "\nRetrieving secret...")?;
        let secret = client
            .get_secret(&session, VARIABLE_KIND, &config.secret_id, None)
            .await
            .map_err(failed(Stage::RetrieveSecret))?;
        writeln!(out, "Retrieved secret: {}", String::from_utf8_lossy(&secret))?;

        if secret != expected {
            warn!(secret_id = %config.secret_id, "Retrieved secret does not match stored value");
            writeln!(out, "Secret Malformed")?;
            return Err(WorkflowError::SecretMalformed);
        }

        info!(secret_id = %config.secret_id, "Workflow completed");
        Ok(WorkflowReport {
            token: session.token().clone(),
            policy_version: loaded.version,
            created_api_key,
            rotated_api_key,
            secret,
        })
    }
}
