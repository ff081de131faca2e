//! Test fixtures with sample data.
//!
//! The sample policies and values mirror the end-to-end workflow run
//! against a `dev` account by the `admin` user.

/// Account used by the sample scenario.
pub const ACCOUNT: &str = "dev";

/// Bootstrap login of the sample account.
pub const ADMIN_LOGIN: &str = "admin";

/// API key the fake server issues to [`ADMIN_LOGIN`] at start-up.
pub const ADMIN_API_KEY: &str = "1x2kxyc2gcwb8v2ftfzf83t5x5bs2hd2ahk1hxzh2d1ah7by1ac6xkmh";

/// Password the sample workflow switches the admin to.
pub const NEW_PASSWORD: &str = "N3w-Passw0rd!";

/// Policy branch the sample policies are loaded into.
pub const POLICY_ID: &str = "root";

/// Identifier of the sample secret.
pub const SECRET_ID: &str = "sampleSecret";

/// Value stored in the sample secret.
pub const SECRET_VALUE: &str = "supersecretstuff";

/// A policy document declaring nothing.
pub const EMPTY_POLICY: &str = "---\n";

/// The sample policy: user `alice` and the variable holding [`SECRET_ID`].
pub const SAMPLE_POLICY: &str = "\
- !user alice
- !variable sampleSecret
";

/// Fully-qualified id under which the sample policy reports alice.
#[must_use]
pub fn alice_role_id() -> String {
    format!("{ACCOUNT}:user:alice")
}

/// Fully-qualified id of the sample secret's variable.
#[must_use]
pub fn sample_variable_id() -> String {
    format!("{ACCOUNT}:variable:{SECRET_ID}")
}

/// A policy declaring one variable per identifier.
#[must_use]
pub fn variables_policy<S: AsRef<str>>(identifiers: &[S]) -> String {
    identifiers
        .iter()
        .map(|id| format!("- !variable {}\n", id.as_ref()))
        .collect()
}
