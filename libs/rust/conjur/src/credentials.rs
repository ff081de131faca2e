//! Credential store.
//!
//! Holds the account, login and secret (password or API key) used for
//! basic-auth calls and for obtaining access tokens.

use crate::error::{ConjurError, ConjurResult};
use secrecy::{ExposeSecret, SecretString};

/// Account name variable.
pub const ACCOUNT_ENV: &str = "CONJUR_ACCOUNT";
/// Login name variable.
pub const LOGIN_ENV: &str = "CONJUR_AUTHN_LOGIN";
/// API key variable.
pub const API_KEY_ENV: &str = "CONJUR_AUTHN_API_KEY";
/// Fallback API key variable used by the admin quick-start setup.
pub const ADMIN_API_KEY_ENV: &str = "CONJUR_ADMIN_API_KEY";

const DEFAULT_ACCOUNT: &str = "dev";
const DEFAULT_LOGIN: &str = "admin";

/// Long-lived credentials for one Conjur role.
///
/// The secret is never empty. `Debug` output redacts it.
#[derive(Debug, Clone)]
pub struct Credentials {
    account: String,
    login: String,
    secret: SecretString,
}

impl Credentials {
    /// Build credentials, rejecting an empty account, login or secret.
    ///
    /// # Errors
    ///
    /// Returns [`ConjurError::Config`] when a value is empty.
    pub fn new(
        account: impl Into<String>,
        login: impl Into<String>,
        secret: impl Into<String>,
    ) -> ConjurResult<Self> {
        let account = account.into();
        let login = login.into();
        let secret = secret.into();

        if account.trim().is_empty() {
            return Err(ConjurError::config("account must not be empty"));
        }
        if login.trim().is_empty() {
            return Err(ConjurError::config("login must not be empty"));
        }
        if secret.is_empty() {
            return Err(ConjurError::config(format!(
                "no API key for {account}:{login}; set {API_KEY_ENV} or {ADMIN_API_KEY_ENV}"
            )));
        }

        Ok(Self {
            account,
            login,
            secret: SecretString::from(secret),
        })
    }

    /// Load credentials from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConjurError::Config`] when no non-empty API key is set.
    pub fn load() -> ConjurResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load credentials through an arbitrary variable lookup.
    ///
    /// `CONJUR_AUTHN_API_KEY` takes precedence over `CONJUR_ADMIN_API_KEY`;
    /// an empty value counts as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConjurError::Config`] when no non-empty API key is found.
    pub fn from_lookup<F>(lookup: F) -> ConjurResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let account = non_empty(ACCOUNT_ENV).unwrap_or_else(|| DEFAULT_ACCOUNT.to_string());
        let login = non_empty(LOGIN_ENV).unwrap_or_else(|| DEFAULT_LOGIN.to_string());
        let secret = non_empty(API_KEY_ENV)
            .or_else(|| non_empty(ADMIN_API_KEY_ENV))
            .ok_or_else(|| {
                ConjurError::config(format!(
                    "Conjur API key not set; export {API_KEY_ENV} (or {ADMIN_API_KEY_ENV})"
                ))
            })?;

        Self::new(account, login, secret)
    }

    /// Account (tenant) name.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Login name, e.g. `admin` or `host/myapp`.
    #[must_use]
    pub fn login(&self) -> &str {
        &self.login
    }

    /// The current password or API key.
    #[must_use]
    pub const fn secret(&self) -> &SecretString {
        &self.secret
    }

    /// Replace the stored secret after a password change or key rotation.
    pub fn update_secret(&mut self, secret: SecretString) {
        self.secret = secret;
    }

    pub(crate) fn basic_auth_password(&self) -> &str {
        self.secret.expose_secret()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_admin_key() {
        let creds = Credentials::from_lookup(lookup(&[(ADMIN_API_KEY_ENV, "admin-key")])).unwrap();
        assert_eq!(creds.account(), "dev");
        assert_eq!(creds.login(), "admin");
        assert_eq!(creds.secret().expose_secret(), "admin-key");
    }

    #[test]
    fn test_authn_key_takes_precedence() {
        let creds = Credentials::from_lookup(lookup(&[
            (ACCOUNT_ENV, "myorg"),
            (LOGIN_ENV, "host/app"),
            (API_KEY_ENV, "authn-key"),
            (ADMIN_API_KEY_ENV, "admin-key"),
        ]))
        .unwrap();
        assert_eq!(creds.account(), "myorg");
        assert_eq!(creds.login(), "host/app");
        assert_eq!(creds.secret().expose_secret(), "authn-key");
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let err = Credentials::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConjurError::Config(_)));
    }

    #[test]
    fn test_empty_secret_is_config_error() {
        let err = Credentials::from_lookup(lookup(&[(ADMIN_API_KEY_ENV, "")])).unwrap_err();
        assert!(matches!(err, ConjurError::Config(_)));

        let err = Credentials::new("dev", "admin", "").unwrap_err();
        assert!(matches!(err, ConjurError::Config(_)));
    }

    #[test]
    fn test_update_secret() {
        let mut creds = Credentials::new("dev", "admin", "old").unwrap();
        creds.update_secret(SecretString::from("new"));
        assert_eq!(creds.basic_auth_password(), "new");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = Credentials::new("dev", "admin", "s3cr3t-api-key").unwrap();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("s3cr3t-api-key"));
        assert!(debug.contains("admin"));
    }
}
