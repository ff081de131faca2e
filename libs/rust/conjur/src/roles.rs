//! Role identifiers and role/status queries.

use crate::{
    authn::Session,
    client::ConjurClient,
    error::{ConjurError, ConjurResult, Operation},
};
use reqwest::Method;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use tracing::instrument;

/// Account-relative role identifier, `kind:identifier` (e.g. `user:alice`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleId {
    kind: String,
    identifier: String,
}

impl RoleId {
    /// Build a role id from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`ConjurError::Config`] if either part is empty or the kind
    /// contains `:`.
    pub fn new(kind: impl Into<String>, identifier: impl Into<String>) -> ConjurResult<Self> {
        let kind = kind.into();
        let identifier = identifier.into();
        if kind.is_empty() || kind.contains(':') || identifier.is_empty() {
            return Err(ConjurError::config(format!(
                "Invalid role id {kind}:{identifier}; expected kind:identifier"
            )));
        }
        Ok(Self { kind, identifier })
    }

    /// Role kind, e.g. `user`, `host`, `group`, `layer`.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Identifier within the kind.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Fully-qualified id as the server reports it, `account:kind:identifier`.
    #[must_use]
    pub fn qualified(&self, account: &str) -> String {
        format!("{account}:{self}")
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.identifier)
    }
}

impl FromStr for RoleId {
    type Err = ConjurError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, identifier) = s.split_once(':').ok_or_else(|| {
            ConjurError::config(format!("Invalid role id {s}; expected kind:identifier"))
        })?;
        Self::new(kind, identifier)
    }
}

/// Options for showing a role.
///
/// With `members` set the server lists memberships instead of the role;
/// `offset`, `limit` and `count` page or count that listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleQuery {
    /// List the role's members
    pub members: bool,
    /// Skip this many members
    pub offset: Option<u32>,
    /// Return at most this many members
    pub limit: Option<u32>,
    /// Return only the member count
    pub count: bool,
}

impl RoleQuery {
    /// Query that lists members.
    #[must_use]
    pub fn members() -> Self {
        Self {
            members: true,
            ..Self::default()
        }
    }

    /// Start the listing at `offset`.
    #[must_use]
    pub const fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Cap the listing at `limit` entries.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Return the count only.
    #[must_use]
    pub const fn counted(mut self) -> Self {
        self.count = true;
        self
    }

    fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if self.members {
            pairs.push(("members", String::new()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset", offset.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if self.count {
            pairs.push(("count", "true".to_string()));
        }
        pairs
    }
}

/// Identity of the authenticated caller.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct WhoAmI {
    /// Address the request came from
    pub client_ip: String,
    /// User agent of the request
    pub user_agent: String,
    /// Account of the token
    pub account: String,
    /// Login of the token's role
    pub username: String,
    /// Token issue time as reported by the server
    pub token_issued_at: String,
}

impl ConjurClient {
    /// Show a role, or list/count its members.
    ///
    /// # Errors
    ///
    /// Returns [`ConjurError::NotFound`] if the role does not exist and
    /// [`ConjurError::Auth`] if the session may not see it.
    #[instrument(skip(self, session, role), fields(account = session.account(), role = %role))]
    pub async fn show_role(
        &self,
        session: &Session,
        role: &RoleId,
        query: &RoleQuery,
    ) -> ConjurResult<serde_json::Value> {
        let url = self.url(&["roles", session.account(), role.kind(), role.identifier()])?;
        let url = &url;
        let pairs = query.to_query_pairs();
        let pairs = &pairs;

        self.with_retry(move || async move {
            let request = self
                .authorized(Method::GET, url.clone(), session)
                .query(pairs);
            let response = self.send(Operation::ShowRole, request).await?;
            Ok(response.json().await?)
        })
        .await
    }

    /// Describe the role behind the session's token.
    ///
    /// # Errors
    ///
    /// Returns [`ConjurError::Auth`] if the token is not accepted.
    #[instrument(skip(self, session), fields(account = session.account()))]
    pub async fn whoami(&self, session: &Session) -> ConjurResult<WhoAmI> {
        let url = self.url(&["whoami"])?;
        let url = &url;

        self.with_retry(move || async move {
            let request = self.authorized(Method::GET, url.clone(), session);
            let response = self.send(Operation::WhoAmI, request).await?;
            Ok(response.json().await?)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{authn::AccessToken, config::ConjurConfig};
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session() -> Session {
        Session::new("dev", AccessToken::new("dG9rZW4="))
    }

    #[test]
    fn test_role_id_parsing() {
        let role: RoleId = "user:alice".parse().unwrap();
        assert_eq!(role.kind(), "user");
        assert_eq!(role.identifier(), "alice");
        assert_eq!(role.qualified("dev"), "dev:user:alice");

        let role: RoleId = "host:apps/web".parse().unwrap();
        assert_eq!(role.identifier(), "apps/web");

        assert!("alice".parse::<RoleId>().is_err());
        assert!(":alice".parse::<RoleId>().is_err());
        assert!("user:".parse::<RoleId>().is_err());
    }

    #[test]
    fn test_role_query_pairs() {
        assert!(RoleQuery::default().to_query_pairs().is_empty());

        let pairs = RoleQuery::members().with_offset(2).with_limit(5).counted().to_query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("members", String::new()),
                ("offset", "2".to_string()),
                ("limit", "5".to_string()),
                ("count", "true".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_show_role_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/roles/dev/group/userGroup"))
            .and(query_param("members", ""))
            .and(query_param("count", "true"))
            .and(header("authorization", "Token token=\"dG9rZW4=\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "count": 3 })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ConjurClient::new(ConjurConfig::new(server.uri())).unwrap();
        let role: RoleId = "group:userGroup".parse().unwrap();
        let result = client
            .show_role(&session(), &role, &RoleQuery::members().counted())
            .await
            .unwrap();
        assert_eq!(result["count"], 3);
    }

    #[tokio::test]
    async fn test_show_missing_role() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("role not found"))
            .mount(&server)
            .await;

        let client = ConjurClient::new(ConjurConfig::new(server.uri())).unwrap();
        let role: RoleId = "user:nobody".parse().unwrap();
        let err = client
            .show_role(&session(), &role, &RoleQuery::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ConjurError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_whoami() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/whoami"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "client_ip": "172.18.0.5",
                "user_agent": "conjur-rust/0.1.0",
                "account": "dev",
                "username": "admin",
                "token_issued_at": "2026-10-19T10:00:00.000+00:00"
            })))
            .mount(&server)
            .await;

        let client = ConjurClient::new(ConjurConfig::new(server.uri())).unwrap();
        let who = client.whoami(&session()).await.unwrap();
        assert_eq!(who.account, "dev");
        assert_eq!(who.username, "admin");
    }
}
