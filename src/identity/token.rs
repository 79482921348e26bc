use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::principal::Identity;

/// What a locally synthesized token encodes. The session store never reads
/// it back; validating tokens is the backend's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub user_id: String,
    /// Expiry, epoch milliseconds.
    pub exp: i64,
}

/// base64(JSON `{"userId", "exp"}`), expiring `ttl` after `now`.
pub fn synthesize(identity: &Identity, now: DateTime<Utc>, ttl: Duration) -> String {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    let claims = TokenClaims { user_id: identity.id.clone(), exp: now.timestamp_millis().saturating_add(ttl_ms) };
    // serializing two plain fields cannot fail
    let json = serde_json::to_vec(&claims).unwrap_or_default();
    base64::engine::general_purpose::STANDARD.encode(json)
}

/// Decode a synthesized token. Diagnostics only.
pub fn peek(token: &str) -> Option<TokenClaims> {
    let bytes = base64::engine::general_purpose::STANDARD.decode(token.trim()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::provider::DemoCredentials;
    use chrono::TimeZone;

    #[test]
    fn encodes_subject_and_expiry() {
        let ident = DemoCredentials::new().lookup("analyst").unwrap().identity.clone();
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 0, 0, 0).unwrap();
        let token = synthesize(&ident, now, Duration::from_secs(86_400));
        let claims = peek(&token).unwrap();
        assert_eq!(claims.user_id, "usr-004");
        assert_eq!(claims.exp, now.timestamp_millis() + 86_400_000);
    }

    #[test]
    fn peek_rejects_foreign_tokens() {
        assert_eq!(peek("eyJhbGciOiJIUzI1NiJ9.e30.sig"), None);
        assert_eq!(peek(""), None);
    }
}
