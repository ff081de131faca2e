//! Conjur error types using thiserror 2.0.
//!
//! Every non-success response is classified per operation into the client's
//! taxonomy. The response body is kept verbatim as the error detail.

use reqwest::StatusCode;
use rust_common::{PlatformError, Retryable};
use thiserror::Error;

/// API operation that produced a response, used to classify failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Exchange credentials for an access token
    Authenticate,
    /// Exchange a password for an API key
    Login,
    /// Change the caller's password
    ChangePassword,
    /// Rotate a role's API key
    RotateApiKey,
    /// Load, replace or update a policy
    ApplyPolicy,
    /// Store a secret value
    CreateSecret,
    /// Fetch one secret value
    GetSecret,
    /// Fetch several secret values
    GetSecrets,
    /// Show a role and optionally its memberships
    ShowRole,
    /// Describe the authenticated caller
    WhoAmI,
}

impl Operation {
    /// Stable name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authenticate => "authenticate",
            Self::Login => "login",
            Self::ChangePassword => "change_password",
            Self::RotateApiKey => "rotate_api_key",
            Self::ApplyPolicy => "apply_policy",
            Self::CreateSecret => "create_secret",
            Self::GetSecret => "get_secret",
            Self::GetSecrets => "get_secrets",
            Self::ShowRole => "show_role",
            Self::WhoAmI => "whoami",
        }
    }
}

/// Conjur-specific errors.
#[derive(Error, Debug)]
pub enum ConjurError {
    /// Required configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication or authorization failed
    #[error("Authentication failed ({status}): {detail}")]
    Auth {
        /// HTTP status code
        status: u16,
        /// Response body as returned by the server
        detail: String,
    },

    /// Policy document rejected
    #[error("Policy rejected ({status}): {detail}")]
    Policy {
        /// HTTP status code
        status: u16,
        /// Response body as returned by the server
        detail: String,
    },

    /// Resource already exists
    #[error("Conflict: {detail}")]
    Conflict {
        /// Response body as returned by the server
        detail: String,
    },

    /// Resource does not exist
    #[error("Not found: {detail}")]
    NotFound {
        /// Response body as returned by the server
        detail: String,
    },

    /// Request parameters rejected by the server
    #[error("Invalid request ({status}): {detail}")]
    InvalidInput {
        /// HTTP status code
        status: u16,
        /// Response body as returned by the server
        detail: String,
    },

    /// Server unavailable or transport failure
    #[error("Conjur unavailable: {0}")]
    Unavailable(String),

    /// Rate limited
    #[error("Rate limited")]
    RateLimited,

    /// Status code outside the documented set
    #[error("Unexpected response ({status}): {detail}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body as returned by the server
        detail: String,
    },

    /// HTTP error while reading a response
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Payload encoding error (base64 values, URLs)
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// Platform error
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Result type for Conjur operations.
pub type ConjurResult<T> = Result<T, ConjurError>;

impl ConjurError {
    /// Check if error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable(_) | Self::RateLimited => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Platform(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an authentication error.
    #[must_use]
    pub fn auth(status: u16, detail: impl Into<String>) -> Self {
        Self::Auth {
            status,
            detail: detail.into(),
        }
    }

    /// HTTP status carried by the error, if it came from a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status, .. }
            | Self::Policy { status, .. }
            | Self::InvalidInput { status, .. }
            | Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::Conflict { .. } => Some(409),
            Self::NotFound { .. } => Some(404),
            Self::RateLimited => Some(429),
            _ => None,
        }
    }

    /// Classify a non-success response for the given operation.
    ///
    /// `detail` is the response body and is carried through unmodified.
    #[must_use]
    pub fn from_response(operation: Operation, status: StatusCode, detail: String) -> Self {
        let code = status.as_u16();
        let policy = operation == Operation::ApplyPolicy;

        match code {
            401 => Self::Auth {
                status: code,
                detail,
            },
            400 | 403 | 404 | 409 | 422 if policy => Self::Policy {
                status: code,
                detail,
            },
            403 => Self::Auth {
                status: code,
                detail,
            },
            // Password complexity violations come back as 422.
            400 | 422 if operation == Operation::ChangePassword => Self::Auth {
                status: code,
                detail,
            },
            404 => Self::NotFound { detail },
            409 => Self::Conflict { detail },
            400 | 422 => Self::InvalidInput {
                status: code,
                detail,
            },
            429 => Self::RateLimited,
            500..=599 => Self::Unavailable(format!("Status {status}: {detail}")),
            _ => Self::UnexpectedStatus {
                status: code,
                detail,
            },
        }
    }
}

impl Retryable for ConjurError {
    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }
}
