//! Console configuration, read from the environment the same way the server
//! binaries read their ports and folders: `IOT_SOC_*` variables, falling back
//! to defaults on anything missing or unparsable.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";
pub const DEFAULT_LOGIN_LATENCY: Duration = Duration::from_millis(500);
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    /// Simulated round trip of a credential check.
    pub login_latency: Duration,
    /// Lifetime encoded into synthesized session tokens.
    pub token_ttl: Duration,
    /// Where `FileStorage` keeps the persisted session. `None` = in memory.
    pub storage_path: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            login_latency: DEFAULT_LOGIN_LATENCY,
            token_ttl: DEFAULT_TOKEN_TTL,
            storage_path: None,
        }
    }
}

impl ConsoleConfig {
    pub fn from_env() -> Self { Self::from_lookup(|k| std::env::var(k).ok()) }

    /// Build from an arbitrary key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> Self {
        let d = Self::default();
        let api_base_url = get("IOT_SOC_API_BASE_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(d.api_base_url);
        let login_latency = get("IOT_SOC_LOGIN_LATENCY_MS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(d.login_latency);
        let token_ttl = get("IOT_SOC_TOKEN_TTL_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(d.token_ttl);
        let storage_path = get("IOT_SOC_STORAGE_PATH").filter(|s| !s.trim().is_empty()).map(PathBuf::from);
        Self { api_base_url, login_latency, token_ttl, storage_path }
    }

    pub fn with_login_latency(mut self, latency: Duration) -> Self { self.login_latency = latency; self }

    pub fn with_api_base_url<S: Into<String>>(mut self, url: S) -> Self { self.api_base_url = url.into(); self }
}
