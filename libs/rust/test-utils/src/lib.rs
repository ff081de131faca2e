//! Shared test utilities for the Conjur Rust libraries.
//!
//! This crate provides:
//! - Proptest generators for identifiers, passwords and secret values
//! - [`FakeConjur`], a stateful in-memory Conjur server mounted on wiremock
//! - Test fixtures with the sample policies and constants

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
pub use mocks::FakeConjur;
