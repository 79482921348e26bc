//! Credential sources the authenticator can check a login against.
//!
//! `DemoCredentials` is the fixed registry the dashboard ships with,
//! `HashedCredentials` holds Argon2 PHC strings instead of plaintext, and
//! `RemoteCredentials` asks the backend's `/auth/login` endpoint.

use std::collections::HashMap;

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use password_hash::{PasswordHash, SaltString};
use serde::{Deserialize, Serialize};

use super::principal::{parse_timestamp, Identity};
use super::role::Role;
use crate::error::AuthError;

/// Result of a successful credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub identity: Identity,
    /// Bearer token issued by the source, if it issues one.
    pub token: Option<String>,
}

impl Verified {
    pub fn local(identity: Identity) -> Self { Self { identity, token: None } }
}

#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// `login_name` arrives lower-cased. Unknown names and wrong secrets
    /// must both yield `AuthError::InvalidCredentials`.
    async fn verify(&self, login_name: &str, secret: &str) -> Result<Verified, AuthError>;

    fn describe(&self) -> &'static str;
}

/// A (login name, secret, identity) entry of a registry.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub secret: String,
    pub identity: Identity,
}

fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).single().unwrap_or_default()
}

fn demo_identity(id: &str, username: &str, email: &str, full_name: &str, role: Role, department: &str, created_at: DateTime<Utc>) -> Identity {
    Identity {
        id: id.into(),
        username: username.into(),
        email: email.into(),
        full_name: full_name.into(),
        role,
        department: Some(department.into()),
        created_at,
        last_login: None,
    }
}

static DEMO_REGISTRY: Lazy<HashMap<String, CredentialRecord>> = Lazy::new(|| {
    let rows = [
        ("admin123", demo_identity("usr-001", "admin", "admin@iotsoc.local", "System Administrator", Role::SuperAdmin, "IT Security", utc(2024, 1, 1))),
        ("sec123", demo_identity("usr-002", "secadmin", "security@iotsoc.local", "Security Administrator", Role::SecurityAdmin, "Security Operations", utc(2024, 1, 15))),
        ("op123", demo_identity("usr-003", "operator", "netops@iotsoc.local", "Network Operator", Role::NetworkOperator, "Network Operations", utc(2024, 2, 1))),
        ("analyst123", demo_identity("usr-004", "analyst", "analyst@iotsoc.local", "Security Analyst", Role::SecurityAnalyst, "Security Analysis", utc(2024, 2, 1))),
    ];
    rows.into_iter()
        .map(|(secret, identity)| (identity.username.to_lowercase(), CredentialRecord { secret: secret.into(), identity }))
        .collect()
});

/// Fixed plaintext registry keyed by lower-cased login name.
#[derive(Debug, Clone)]
pub struct DemoCredentials {
    records: HashMap<String, CredentialRecord>,
}

impl Default for DemoCredentials {
    fn default() -> Self { Self { records: DEMO_REGISTRY.clone() } }
}

impl DemoCredentials {
    pub fn new() -> Self { Self::default() }

    pub fn from_records<I: IntoIterator<Item = CredentialRecord>>(records: I) -> Self {
        Self { records: records.into_iter().map(|r| (r.identity.username.to_lowercase(), r)).collect() }
    }

    pub fn lookup(&self, login_name: &str) -> Option<&CredentialRecord> { self.records.get(&login_name.to_lowercase()) }

    pub fn login_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.records.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[async_trait]
impl CredentialSource for DemoCredentials {
    async fn verify(&self, login_name: &str, secret: &str) -> Result<Verified, AuthError> {
        match self.lookup(login_name) {
            Some(rec) if rec.secret == secret => Ok(Verified::local(rec.identity.clone())),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    fn describe(&self) -> &'static str { "demo" }
}

/// Registry holding Argon2 PHC strings rather than secrets.
#[derive(Debug, Clone, Default)]
pub struct HashedCredentials {
    records: HashMap<String, (String, Identity)>,
}

pub fn hash_secret(secret: &str) -> Result<String, password_hash::Error> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|_| password_hash::Error::Crypto)?;
    let salt = SaltString::encode_b64(&salt_bytes)?;
    Ok(Argon2::default().hash_password(secret.as_bytes(), &salt)?.to_string())
}

pub fn verify_secret(phc: &str, secret: &str) -> bool {
    PasswordHash::new(phc)
        .map(|parsed| Argon2::default().verify_password(secret.as_bytes(), &parsed).is_ok())
        .unwrap_or(false)
}

impl HashedCredentials {
    pub fn new() -> Self { Self::default() }

    /// Add an identity with an already-computed PHC string.
    pub fn insert_hashed(&mut self, identity: Identity, phc: String) {
        self.records.insert(identity.username.to_lowercase(), (phc, identity));
    }

    /// Hash `secret` and add the identity.
    pub fn register(&mut self, identity: Identity, secret: &str) -> Result<(), password_hash::Error> {
        let phc = hash_secret(secret)?;
        self.insert_hashed(identity, phc);
        Ok(())
    }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }
}

#[async_trait]
impl CredentialSource for HashedCredentials {
    async fn verify(&self, login_name: &str, secret: &str) -> Result<Verified, AuthError> {
        let Some((phc, identity)) = self.records.get(&login_name.to_lowercase()) else {
            return Err(AuthError::InvalidCredentials);
        };
        if !verify_secret(phc, secret) {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(Verified::local(identity.clone()))
    }

    fn describe(&self) -> &'static str { "hashed" }
}

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

/// `/auth/login` response body.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    pub user: RemoteUser,
}

/// Backend user record; ids are integers there and timestamps may lack an offset.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUser {
    pub id: serde_json::Value,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub role: String,
    #[serde(default)]
    pub department: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub last_login: Option<String>,
}

impl RemoteUser {
    pub fn into_identity(self) -> Result<Identity, AuthError> {
        let role: Role = self.role.parse().map_err(|e: super::role::UnknownRole| AuthError::Backend(e.to_string()))?;
        let created_at = parse_timestamp(&self.created_at)
            .ok_or_else(|| AuthError::Backend(format!("bad created_at '{}'", self.created_at)))?;
        let id = match self.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        Ok(Identity {
            id,
            full_name: self.full_name.unwrap_or_else(|| self.username.clone()),
            username: self.username,
            email: self.email,
            role,
            department: self.department,
            created_at,
            last_login: self.last_login.as_deref().and_then(parse_timestamp),
        })
    }
}

/// Credential check against the dashboard backend.
#[derive(Debug, Clone)]
pub struct RemoteCredentials {
    base: String,
    client: reqwest::Client,
}

impl RemoteCredentials {
    pub fn new<S: Into<String>>(base_url: S) -> Self {
        Self { base: base_url.into().trim_end_matches('/').to_string(), client: reqwest::Client::new() }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self { self.client = client; self }
}

#[async_trait]
impl CredentialSource for RemoteCredentials {
    async fn verify(&self, login_name: &str, secret: &str) -> Result<Verified, AuthError> {
        let url = format!("{}/auth/login", self.base);
        let resp = self
            .client
            .post(url)
            .json(&LoginBody { username: login_name, password: secret })
            .send()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        let status = resp.status();
        // disabled accounts answer 403; reported the same as bad credentials
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(AuthError::Backend(format!("login endpoint answered HTTP {}", status.as_u16())));
        }
        let body: TokenResponse = resp.json().await.map_err(|e| AuthError::Backend(e.to_string()))?;
        let identity = body.user.into_identity()?;
        Ok(Verified { identity, token: Some(body.access_token) })
    }

    fn describe(&self) -> &'static str { "remote" }
}
