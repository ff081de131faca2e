//! Shared library for cross-cutting concerns in the Conjur Rust client and tools.
//!
//! This crate provides centralized implementations for:
//! - Error types with retryability classification
//! - HTTP client configuration and building (CA bundle, mutual TLS)
//! - Retry policies with exponential backoff
//! - Tracing subscriber initialization

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod retry;
pub mod tracing_config;

pub use error::{PlatformError, PlatformResult, Retryable};
pub use http::{HttpConfig, TlsConfig, build_http_client};
pub use retry::{RetryConfig, RetryPolicy};
pub use tracing_config::{TracingConfig, init_tracing};
