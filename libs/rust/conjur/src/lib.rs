//! Conjur secrets-management client.
//!
//! Typed access to the Conjur REST API: authentication and credential
//! management, policy loading, secret storage and retrieval, and role
//! queries. Every call carries its identity explicitly, as [`Credentials`]
//! for the `authn` endpoints or a [`Session`] for everything else.

pub mod authn;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod policy;
pub mod roles;
pub mod secrets;

pub use authn::{AccessToken, Session, TokenEncoding};
pub use client::ConjurClient;
pub use config::ConjurConfig;
pub use credentials::Credentials;
pub use error::{ConjurError, ConjurResult, Operation};
pub use policy::{CreatedRole, PolicyLoadResult, PolicyMode};
pub use roles::{RoleId, RoleQuery, WhoAmI};
pub use secrets::{BatchEncoding, VARIABLE_KIND};
