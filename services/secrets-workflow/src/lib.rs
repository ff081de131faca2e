//! Secrets workflow driver.
//!
//! Runs the end-to-end Conjur demonstration: authenticate, change the
//! password, reset and load policy, rotate the created role's key, then
//! store a secret and verify it reads back unchanged.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod workflow;

pub use config::WorkflowConfig;
pub use error::{Stage, WorkflowError};
pub use workflow::{Workflow, WorkflowReport};
