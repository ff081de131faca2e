//! Centralized error types for all Rust libraries.
//!
//! This module provides a unified error type for transport-level concerns
//! shared by the client crates, with built-in retryability classification.

use thiserror::Error;

/// Classification hook used by [`crate::RetryPolicy`].
///
/// Implemented by every error type that can flow through a retried operation.
pub trait Retryable {
    /// Whether the failure is transient and the operation may succeed on retry.
    fn is_retryable(&self) -> bool;
}

/// Common error type for platform operations.
///
/// Covers the transport layer shared by the client crates: the HTTP stack,
/// TLS material and arguments rejected before a request is sent.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// TLS material could not be loaded
    #[error("TLS configuration error: {0}")]
    Tls(String),
}

/// Result type for platform operations.
pub type PlatformResult<T> = Result<T, PlatformError>;

impl PlatformError {
    /// Check if this error is retryable.
    ///
    /// Only connection failures and timeouts are transient; configuration
    /// and input errors fail the same way on every attempt.
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_common::PlatformError;
    ///
    /// let err = PlatformError::invalid_input("no variable ids requested");
    /// assert!(!err.is_retryable());
    /// ```
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::InvalidInput(_) | Self::Tls(_) => false,
        }
    }

    /// Create an invalid input error with the given message.
    #[must_use]
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a TLS configuration error with the given message.
    #[must_use]
    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }
}

impl Retryable for PlatformError {
    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }
}
