//! Workflow errors.

use conjur_client::ConjurError;
use std::fmt;
use thiserror::Error;

/// A step of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Exchange the admin credentials for a token
    Authenticate,
    /// Change the admin password
    ChangePassword,
    /// Replace the policy branch with the empty document
    LoadEmptyPolicy,
    /// Load the full policy
    LoadPolicy,
    /// Rotate the created role's API key
    RotateApiKey,
    /// Store the sample secret
    StoreSecret,
    /// Read the sample secret back
    RetrieveSecret,
}

impl Stage {
    /// Stage name for messages and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authenticate => "authenticate",
            Self::ChangePassword => "change password",
            Self::LoadEmptyPolicy => "load empty policy",
            Self::LoadPolicy => "load policy",
            Self::RotateApiKey => "rotate API key",
            Self::StoreSecret => "store secret",
            Self::RetrieveSecret => "retrieve secret",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that abort a workflow run.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The Conjur client could not be constructed
    #[error("Conjur client setup failed")]
    Client(#[from] ConjurError),

    /// A remote call failed
    #[error("{stage} failed")]
    Conjur {
        /// Stage that failed
        stage: Stage,
        /// Underlying client error
        #[source]
        source: ConjurError,
    },

    /// The full policy load did not report the role to rotate
    #[error("Policy load did not create {0}; its API key is unavailable")]
    MissingCreatedRole(String),

    /// The retrieved secret differs from the stored one
    #[error("Secret Malformed")]
    SecretMalformed,

    /// Writing stage output failed
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),
}

impl WorkflowError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Map a client-side error, keeping configuration problems as
    /// [`WorkflowError::Config`].
    #[must_use]
    pub fn client(err: ConjurError) -> Self {
        match err {
            ConjurError::Config(msg) => Self::Config(msg),
            other => Self::Client(other),
        }
    }

    /// The stage a remote failure happened in.
    #[must_use]
    pub const fn stage(&self) -> Option<Stage> {
        match self {
            Self::Conjur { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Attach `stage` to a client error.
pub(crate) fn failed(stage: Stage) -> impl FnOnce(ConjurError) -> WorkflowError {
    move |source| WorkflowError::Conjur { stage, source }
}
