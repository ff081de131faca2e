//! In-memory Conjur server for tests.
//!
//! [`FakeConjur`] implements [`wiremock::Respond`] over shared state, so a
//! single catch-all mock serves the whole REST surface the client uses:
//! authentication, password change, key rotation, policy loading, secrets
//! and role queries.
//!
//! Model:
//! - the bootstrap role `user:admin` owns everything; other roles may only
//!   read and write secrets and rotate their own key
//! - a role accepts its current API key or its password over basic auth and
//!   `authenticate`; changing the password also retires the current API key
//! - policy documents are one `- !kind identifier` record per line, loaded
//!   into the `root` branch only

use crate::fixtures::{ACCOUNT, ADMIN_API_KEY, ADMIN_LOGIN};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const ADMIN_ROLE: &str = "user:admin";
const POLICY_KINDS: [&str; 5] = ["user", "host", "group", "layer", "variable"];

/// Stateful fake of a Conjur appliance.
#[derive(Debug, Clone)]
pub struct FakeConjur {
    state: Arc<Mutex<State>>,
}

#[derive(Debug)]
struct State {
    account: String,
    roles: BTreeMap<String, RoleRecord>,
    variables: BTreeMap<String, Vec<Vec<u8>>>,
    tokens: HashMap<String, String>,
    policy_version: u64,
    counter: u64,
}

#[derive(Debug, Clone)]
struct RoleRecord {
    api_key: String,
    password: Option<String>,
    from_policy: bool,
}

impl RoleRecord {
    fn accepts(&self, secret: &str) -> bool {
        self.api_key == secret || self.password.as_deref() == Some(secret)
    }
}

type Reply = Result<ResponseTemplate, ResponseTemplate>;

impl Default for FakeConjur {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeConjur {
    /// Fake for account [`ACCOUNT`] whose admin holds [`ADMIN_API_KEY`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_admin(ACCOUNT, ADMIN_API_KEY)
    }

    /// Fake for `account` whose `admin` user holds `admin_api_key`.
    #[must_use]
    pub fn with_admin(account: &str, admin_api_key: &str) -> Self {
        let mut roles = BTreeMap::new();
        roles.insert(
            ADMIN_ROLE.to_owned(),
            RoleRecord {
                api_key: admin_api_key.to_owned(),
                password: None,
                from_policy: false,
            },
        );
        Self {
            state: Arc::new(Mutex::new(State {
                account: account.to_owned(),
                roles,
                variables: BTreeMap::new(),
                tokens: HashMap::new(),
                policy_version: 0,
                counter: 0,
            })),
        }
    }

    /// Start a mock server answering every request from this fake.
    pub async fn start(&self) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(self.clone())
            .mount(&server)
            .await;
        server
    }

    /// Current API key of a role, `kind:identifier`.
    #[must_use]
    pub fn api_key(&self, role: &str) -> Option<String> {
        self.lock().roles.get(role).map(|r| r.api_key.clone())
    }

    /// Whether a role, `kind:identifier`, exists.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.lock().roles.contains_key(role)
    }

    /// Number of stored versions of a variable; `None` if undeclared.
    #[must_use]
    pub fn secret_versions(&self, identifier: &str) -> Option<usize> {
        self.lock().variables.get(identifier).map(Vec::len)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Respond for FakeConjur {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let segments: Vec<String> = request
            .url
            .path_segments()
            .map(|segments| segments.map(percent_decode).collect())
            .unwrap_or_default();
        let segments: Vec<&str> = segments.iter().map(String::as_str).collect();
        let mut state = self.lock();

        let reply = match (request.method.as_str(), segments.as_slice()) {
            ("POST", ["authn", account, login, "authenticate"]) => {
                state.authenticate(request, account, login)
            }
            ("GET", ["authn", account, "login"]) => state.login(request, account),
            ("PUT", ["authn", account, "password"]) => state.change_password(request, account),
            ("PUT", ["authn", account, "api_key"]) => state.rotate_api_key(request, account),
            (method @ ("POST" | "PUT" | "PATCH"), ["policies", account, "policy", branch]) => {
                state.apply_policy(request, method, account, branch)
            }
            ("POST", ["secrets", account, "variable", id]) => state.store_secret(request, account, id),
            ("GET", ["secrets", account, "variable", id]) => state.fetch_secret(request, account, id),
            ("GET", ["secrets"]) => state.fetch_secrets(request),
            ("GET", ["whoami"]) => state.whoami(request),
            ("GET", ["roles", account, kind, id]) => state.show_role(request, account, kind, id),
            _ => Err(not_found("no such endpoint")),
        };
        reply.unwrap_or_else(|error| error)
    }
}

impl State {
    fn authenticate(&mut self, request: &Request, account: &str, login: &str) -> Reply {
        let role = role_for_login(login);
        let secret = String::from_utf8_lossy(&request.body);
        let accepted = account == self.account
            && self.roles.get(&role).is_some_and(|r| r.accepts(&secret));
        if !accepted {
            return Err(unauthorized());
        }

        let (raw, encoded) = self.issue_token(&role);
        let body = if header(request, "accept-encoding") == Some("base64") {
            encoded
        } else {
            raw
        };
        Ok(ResponseTemplate::new(200).set_body_string(body))
    }

    fn login(&self, request: &Request, account: &str) -> Reply {
        let role = self.basic(request, account)?;
        let key = self.roles.get(&role).map(|r| r.api_key.clone()).unwrap_or_default();
        Ok(ResponseTemplate::new(200).set_body_string(key))
    }

    fn change_password(&mut self, request: &Request, account: &str) -> Reply {
        let role = self.basic(request, account)?;
        let password = String::from_utf8_lossy(&request.body).into_owned();
        if !is_valid_password(&password) {
            return Err(validation_failed(
                "password must be 12 to 128 characters with 2 upper-case, 2 lower-case, 1 digit and 1 special character",
            ));
        }

        let api_key = self.generate_key();
        if let Some(record) = self.roles.get_mut(&role) {
            record.password = Some(password);
            record.api_key = api_key;
        }
        Ok(ResponseTemplate::new(204))
    }

    fn rotate_api_key(&mut self, request: &Request, account: &str) -> Reply {
        let target = query_value(request, "role");
        let role = match target {
            Some(target) => {
                let caller = self.bearer(request)?;
                if account != self.account {
                    return Err(not_found("account not found"));
                }
                if caller != ADMIN_ROLE && caller != target {
                    return Err(forbidden());
                }
                if !self.roles.contains_key(&target) {
                    return Err(not_found(&format!("Role '{target}' not found")));
                }
                target
            }
            None => self.basic(request, account)?,
        };

        let api_key = self.generate_key();
        if let Some(record) = self.roles.get_mut(&role) {
            record.api_key.clone_from(&api_key);
        }
        Ok(ResponseTemplate::new(200).set_body_string(api_key))
    }

    fn apply_policy(&mut self, request: &Request, method: &str, account: &str, branch: &str) -> Reply {
        let caller = self.bearer(request)?;
        if account != self.account {
            return Err(not_found("account not found"));
        }
        if caller != ADMIN_ROLE {
            return Err(forbidden());
        }
        if branch != "root" {
            return Err(not_found(&format!("Policy '{branch}' not found")));
        }

        let records = parse_policy(&String::from_utf8_lossy(&request.body))
            .map_err(|message| validation_failed(&message))?;

        if method == "PUT" {
            let keep: BTreeSet<String> = records.iter().map(|(kind, id)| format!("{kind}:{id}")).collect();
            self.roles.retain(|key, record| !record.from_policy || keep.contains(key));
            self.variables.retain(|id, _| keep.contains(&format!("variable:{id}")));
            let roles = &self.roles;
            self.tokens.retain(|_, role| roles.contains_key(role));
        }

        let mut created = serde_json::Map::new();
        for (kind, id) in records {
            if kind == "variable" {
                self.variables.entry(id).or_default();
                continue;
            }
            let key = format!("{kind}:{id}");
            if self.roles.contains_key(&key) {
                continue;
            }
            let api_key = self.generate_key();
            if kind == "user" || kind == "host" {
                let qualified = format!("{}:{key}", self.account);
                created.insert(qualified.clone(), json!({ "id": qualified, "api_key": api_key }));
            }
            self.roles.insert(
                key,
                RoleRecord {
                    api_key,
                    password: None,
                    from_policy: true,
                },
            );
        }

        self.policy_version += 1;
        Ok(ResponseTemplate::new(201).set_body_json(json!({
            "created_roles": created,
            "version": self.policy_version,
        })))
    }

    fn store_secret(&mut self, request: &Request, account: &str, id: &str) -> Reply {
        self.bearer(request)?;
        if account != self.account {
            return Err(not_found("account not found"));
        }
        let versions = self
            .variables
            .get_mut(id)
            .ok_or_else(|| not_found(&format!("Variable '{id}' not found")))?;
        versions.push(request.body.clone());
        Ok(ResponseTemplate::new(201))
    }

    fn fetch_secret(&self, request: &Request, account: &str, id: &str) -> Reply {
        self.bearer(request)?;
        let missing = || not_found(&format!("Variable '{id}' is empty or not found"));
        if account != self.account {
            return Err(missing());
        }
        let versions = self.variables.get(id).ok_or_else(missing)?;
        let value = match query_value(request, "version") {
            Some(version) => version
                .parse::<usize>()
                .ok()
                .and_then(|v| v.checked_sub(1))
                .and_then(|index| versions.get(index)),
            None => versions.last(),
        }
        .ok_or_else(missing)?;
        Ok(ResponseTemplate::new(200).set_body_bytes(value.clone()))
    }

    fn fetch_secrets(&self, request: &Request) -> Reply {
        self.bearer(request)?;
        let ids = query_value(request, "variable_ids").unwrap_or_default();
        let base64 = header(request, "accept-encoding") == Some("base64");

        let mut values = serde_json::Map::new();
        for id in ids.split(',').filter(|id| !id.is_empty()) {
            let value = id
                .strip_prefix(&format!("{}:variable:", self.account))
                .and_then(|identifier| self.variables.get(identifier))
                .and_then(|versions| versions.last())
                .ok_or_else(|| not_found(&format!("Variable '{id}' is empty or not found")))?;
            let value = if base64 {
                STANDARD.encode(value)
            } else {
                String::from_utf8(value.clone()).map_err(|_| ResponseTemplate::new(406))?
            };
            values.insert(id.to_owned(), Value::String(value));
        }
        if values.is_empty() {
            return Err(validation_failed("variable_ids must not be empty"));
        }
        Ok(ResponseTemplate::new(200).set_body_json(Value::Object(values)))
    }

    fn whoami(&self, request: &Request) -> Reply {
        let role = self.bearer(request)?;
        Ok(ResponseTemplate::new(200).set_body_json(json!({
            "client_ip": "127.0.0.1",
            "user_agent": header(request, "user-agent").unwrap_or_default(),
            "account": self.account,
            "username": login_for_role(&role),
            "token_issued_at": "2026-01-01T00:00:00.000+00:00",
        })))
    }

    fn show_role(&self, request: &Request, account: &str, kind: &str, id: &str) -> Reply {
        self.bearer(request)?;
        let key = format!("{kind}:{id}");
        if account != self.account || !self.roles.contains_key(&key) {
            return Err(not_found(&format!("Role '{key}' not found")));
        }
        let body = if query_value(request, "members").is_some() {
            if query_value(request, "count").is_some() {
                json!({ "count": 0 })
            } else {
                json!([])
            }
        } else {
            json!({ "id": format!("{account}:{key}"), "members": [] })
        };
        Ok(ResponseTemplate::new(200).set_body_json(body))
    }

    fn basic(&self, request: &Request, account: &str) -> Result<String, ResponseTemplate> {
        let (login, secret) = header(request, "authorization")
            .and_then(|value| value.strip_prefix("Basic "))
            .and_then(|value| STANDARD.decode(value).ok())
            .and_then(|value| String::from_utf8(value).ok())
            .and_then(|value| {
                value
                    .split_once(':')
                    .map(|(login, secret)| (login.to_owned(), secret.to_owned()))
            })
            .ok_or_else(unauthorized)?;

        let role = role_for_login(&login);
        let accepted = account == self.account
            && self.roles.get(&role).is_some_and(|r| r.accepts(&secret));
        if accepted { Ok(role) } else { Err(unauthorized()) }
    }

    fn bearer(&self, request: &Request) -> Result<String, ResponseTemplate> {
        header(request, "authorization")
            .and_then(|value| value.strip_prefix("Token token=\""))
            .and_then(|value| value.strip_suffix('"'))
            .and_then(|token| self.tokens.get(token).cloned())
            .ok_or_else(unauthorized)
    }

    fn issue_token(&mut self, role: &str) -> (String, String) {
        self.counter += 1;
        let payload = json!({ "sub": login_for_role(role), "iat": self.counter }).to_string();
        let raw = json!({
            "protected": STANDARD.encode(r#"{"alg":"conjur.org/slosilo/v2"}"#),
            "payload": STANDARD.encode(payload),
            "signature": format!("{:016x}", self.counter.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
        })
        .to_string();
        let encoded = STANDARD.encode(&raw);
        self.tokens.insert(encoded.clone(), role.to_owned());
        (raw, encoded)
    }

    fn generate_key(&mut self) -> String {
        self.counter += 1;
        format!(
            "{:016x}{:016x}",
            self.counter.wrapping_mul(0x9E37_79B9_7F4A_7C15),
            self.counter.wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
        )
    }
}

/// Whether a password meets the server's complexity rules.
#[must_use]
pub fn is_valid_password(password: &str) -> bool {
    let count = |f: fn(&char) -> bool| password.chars().filter(f).count();
    (12..=128).contains(&password.chars().count())
        && count(char::is_ascii_uppercase) >= 2
        && count(char::is_ascii_lowercase) >= 2
        && count(char::is_ascii_digit) >= 1
        && count(|c| !c.is_ascii_alphanumeric()) >= 1
}

fn parse_policy(document: &str) -> Result<Vec<(String, String)>, String> {
    let mut records = Vec::new();
    for (number, line) in document.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line == "---" || line.starts_with('#') {
            continue;
        }
        let record = line
            .strip_prefix("- !")
            .and_then(|rest| rest.split_once(' '))
            .map(|(kind, id)| (kind.trim(), id.trim()))
            .filter(|(kind, id)| POLICY_KINDS.contains(kind) && !id.is_empty());
        match record {
            Some((kind, id)) => records.push((kind.to_owned(), id.to_owned())),
            None => return Err(format!("line {}: unsupported record {line:?}", number + 1)),
        }
    }
    Ok(records)
}

fn role_for_login(login: &str) -> String {
    match login.strip_prefix("host/") {
        Some(host) => format!("host:{host}"),
        None => format!("user:{login}"),
    }
}

fn login_for_role(role: &str) -> String {
    match role.split_once(':') {
        Some(("user", login)) => login.to_owned(),
        Some((kind, id)) => format!("{kind}/{id}"),
        None => role.to_owned(),
    }
}

fn header<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request.headers.get(name).and_then(|value| value.to_str().ok())
}

fn query_value(request: &Request, name: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let escaped = (bytes[i] == b'%')
            .then(|| bytes.get(i + 1..i + 3))
            .flatten()
            .and_then(|hex| std::str::from_utf8(hex).ok())
            .and_then(|hex| u8::from_str_radix(hex, 16).ok());
        if let Some(byte) = escaped {
            decoded.push(byte);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn unauthorized() -> ResponseTemplate {
    ResponseTemplate::new(401)
}

fn forbidden() -> ResponseTemplate {
    ResponseTemplate::new(403).set_body_json(json!({
        "error": { "code": "forbidden", "message": "Forbidden" }
    }))
}

fn not_found(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "error": { "code": "not_found", "message": message }
    }))
}

fn validation_failed(message: &str) -> ResponseTemplate {
    ResponseTemplate::new(422).set_body_json(json!({
        "error": { "code": "validation_failed", "message": message }
    }))
}
