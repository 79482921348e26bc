use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use super::provider::{CredentialSource, DemoCredentials, Verified};
use crate::config::{ConsoleConfig, DEFAULT_LOGIN_LATENCY};
use crate::error::AuthError;

/// Checks a login name and secret against a `CredentialSource`.
///
/// Every attempt waits out `latency` before the check, standing in for the
/// network round trip. The returned future is cancel-safe: dropping it
/// abandons the attempt with no side effects.
#[derive(Clone)]
pub struct Authenticator {
    source: Arc<dyn CredentialSource>,
    latency: Duration,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator").field("source", &self.source.describe()).field("latency", &self.latency).finish()
    }
}

impl Default for Authenticator {
    fn default() -> Self { Self::new(Arc::new(DemoCredentials::new())) }
}

impl Authenticator {
    pub fn new(source: Arc<dyn CredentialSource>) -> Self { Self { source, latency: DEFAULT_LOGIN_LATENCY } }

    /// `source` with the latency taken from `config`.
    pub fn configured(source: Arc<dyn CredentialSource>, config: &ConsoleConfig) -> Self {
        Self { source, latency: config.login_latency }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self { self.latency = latency; self }

    pub fn latency(&self) -> Duration { self.latency }

    /// On success the identity is a fresh record with `last_login` set to now.
    pub async fn login(&self, login_name: &str, secret: &str) -> Result<Verified, AuthError> {
        let normalized = login_name.to_lowercase();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.source.verify(&normalized, secret).await {
            Ok(verified) => {
                let identity = verified.identity.with_last_login(Utc::now());
                info!(target: "iotsoc::auth", "login ok user={} role={} source={}", identity.username, identity.role, self.source.describe());
                Ok(Verified { identity, token: verified.token })
            }
            Err(e) => {
                debug!(target: "iotsoc::auth", "login rejected user={} source={}: {}", normalized, self.source.describe(), e);
                Err(e)
            }
        }
    }
}
