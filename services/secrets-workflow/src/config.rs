//! Workflow configuration.
//!
//! Loaded from environment variables, optionally seeded from a `.env`
//! file. Connection and credential settings come from the client crate;
//! the rest describes what the run creates.

use crate::error::WorkflowError;
use conjur_client::{ConjurConfig, Credentials, RoleId};
use secrecy::SecretString;
use std::path::Path;

const DEFAULT_NEW_PASSWORD: &str = "N3w-Passw0rd!";
const DEFAULT_POLICY_ID: &str = "root";
const DEFAULT_ROTATE_ROLE: &str = "user:alice";
const DEFAULT_SECRET_ID: &str = "sampleSecret";
const DEFAULT_SECRET_VALUE: &str = "supersecretstuff";

/// Empty policy used to reset the branch before the full load.
pub const DEFAULT_EMPTY_POLICY: &str = include_str!("../policy/empty.yml");

/// Policy creating the rotated role and the secret's variable.
pub const DEFAULT_POLICY: &str = include_str!("../policy/policy.yml");

/// Workflow configuration.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Connection settings
    pub conjur: ConjurConfig,
    /// Admin credentials the run starts from
    pub credentials: Credentials,
    /// Password the admin is switched to
    pub new_password: SecretString,
    /// Document that resets the policy branch
    pub empty_policy: String,
    /// Document loaded after the reset
    pub policy: String,
    /// Policy branch both documents are submitted to
    pub policy_id: String,
    /// Role created by `policy` whose key is rotated
    pub rotate_role: RoleId,
    /// Variable the secret is stored on
    pub secret_id: String,
    /// Secret value stored and verified
    pub secret_value: SecretString,
}

impl WorkflowConfig {
    /// Load configuration from `.env` and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing, a value is invalid or a
    /// policy file cannot be read.
    pub fn from_env() -> Result<Self, WorkflowError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// See [`WorkflowConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WorkflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let conjur = ConjurConfig::from_lookup(&lookup).map_err(WorkflowError::client)?;
        let credentials = Credentials::from_lookup(&lookup).map_err(WorkflowError::client)?;
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let empty_policy = match lookup("WORKFLOW_EMPTY_POLICY") {
            Some(path) => read_policy(&path)?,
            None => DEFAULT_EMPTY_POLICY.to_string(),
        };
        let policy = match lookup("WORKFLOW_POLICY") {
            Some(path) => read_policy(&path)?,
            None => DEFAULT_POLICY.to_string(),
        };

        let rotate_role = var("WORKFLOW_ROTATE_ROLE", DEFAULT_ROTATE_ROLE)
            .parse()
            .map_err(|e| WorkflowError::config(format!("Invalid WORKFLOW_ROTATE_ROLE: {e}")))?;

        Ok(Self {
            conjur,
            credentials,
            new_password: SecretString::from(var("WORKFLOW_NEW_PASSWORD", DEFAULT_NEW_PASSWORD)),
            empty_policy,
            policy,
            policy_id: var("WORKFLOW_POLICY_ID", DEFAULT_POLICY_ID),
            rotate_role,
            secret_id: var("WORKFLOW_SECRET_ID", DEFAULT_SECRET_ID),
            secret_value: SecretString::from(var("WORKFLOW_SECRET_VALUE", DEFAULT_SECRET_VALUE)),
        })
    }
}

fn read_policy(path: impl AsRef<Path>) -> Result<String, WorkflowError> {
    let path = path.as_ref();
    std::fs::read_to_string(path)
        .map_err(|e| WorkflowError::config(format!("Cannot read policy {}: {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = WorkflowConfig::from_lookup(lookup(&[("CONJUR_ADMIN_API_KEY", "key")])).unwrap();

        assert_eq!(config.credentials.account(), "dev");
        assert_eq!(config.credentials.login(), "admin");
        assert_eq!(config.new_password.expose_secret(), "N3w-Passw0rd!");
        assert_eq!(config.policy_id, "root");
        assert_eq!(config.rotate_role.to_string(), "user:alice");
        assert_eq!(config.secret_id, "sampleSecret");
        assert_eq!(config.secret_value.expose_secret(), "supersecretstuff");
        assert!(config.policy.contains("- !user alice"));
        assert!(!config.empty_policy.contains("- !"));
    }

    #[test]
    fn test_missing_api_key() {
        let err = WorkflowConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, WorkflowError::Config(ref msg) if msg.contains("CONJUR_AUTHN_API_KEY")));
        assert!(err.to_string().starts_with("Configuration error: "));
    }

    #[test]
    fn test_policy_files_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "- !host ci").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = WorkflowConfig::from_lookup(lookup(&[
            ("CONJUR_ADMIN_API_KEY", "key"),
            ("WORKFLOW_POLICY", path.as_str()),
            ("WORKFLOW_ROTATE_ROLE", "host:ci"),
        ]))
        .unwrap();
        assert_eq!(config.policy, "- !host ci\n");
        assert_eq!(config.rotate_role.kind(), "host");
    }

    #[test]
    fn test_invalid_values() {
        let err = WorkflowConfig::from_lookup(lookup(&[
            ("CONJUR_ADMIN_API_KEY", "key"),
            ("WORKFLOW_ROTATE_ROLE", "alice"),
        ]))
        .unwrap_err();
        assert!(matches!(err, WorkflowError::Config(_)));

        let err = WorkflowConfig::from_lookup(lookup(&[
            ("CONJUR_ADMIN_API_KEY", "key"),
            ("WORKFLOW_POLICY", "/nonexistent/policy.yml"),
        ]))
        .unwrap_err();
        assert!(matches!(err, WorkflowError::Config(_)));
    }
}
