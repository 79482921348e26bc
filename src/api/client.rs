use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::types::{DetectionEvent, IsolateRequest, RecentPacket, SwitchPort};
use crate::config::ConsoleConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{Identity, RemoteUser, SessionStore, LOGIN_PATH};

/// Client for the dashboard REST API.
///
/// Each request carries the session's bearer token when one exists. A 401
/// from any endpoint ends the session that sent the request (both persisted
/// keys are cleared and listeners are told) and surfaces as
/// `AppError::Unauthorized` pointing at the login page. A session started
/// after the request went out is left alone. Nothing is retried.
#[derive(Clone)]
pub struct ApiClient {
    base: String,
    http: reqwest::Client,
    session: Arc<SessionStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.debug_struct("ApiClient").field("base", &self.base).finish() }
}

fn detail_of(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(|s| s.to_string()))
        .unwrap_or_else(|| body.trim().chars().take(200).collect())
}

impl ApiClient {
    pub fn new(config: &ConsoleConfig, session: Arc<SessionStore>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::config(format!("http client: {e}")))?;
        Ok(Self::with_client(&config.api_base_url, http, session))
    }

    pub fn with_client(base_url: &str, http: reqwest::Client, session: Arc<SessionStore>) -> Self {
        Self { base: base_url.trim_end_matches('/').to_string(), http, session }
    }

    pub fn base_url(&self) -> &str { &self.base }

    fn url(&self, path: &str) -> String { format!("{}/{}", self.base, path.trim_start_matches('/')) }

    async fn send<B: Serialize + ?Sized>(&self, method: Method, path: &str, body: Option<&B>) -> AppResult<reqwest::Response> {
        let mut req = self.http.request(method.clone(), self.url(path));
        let sent = self.session.token();
        if let Some(token) = &sent {
            req = req.bearer_auth(token);
        }
        if let Some(b) = body {
            req = req.json(b);
        }
        let resp = req.send().await?;
        let status = resp.status();
        debug!(target: "iotsoc::api", "{} /{} -> {}", method, path.trim_start_matches('/'), status.as_u16());
        if status.is_success() {
            return Ok(resp);
        }
        let detail = detail_of(&resp.text().await.unwrap_or_default());
        match status {
            StatusCode::UNAUTHORIZED => {
                // only the session whose token went out with the request ends
                match sent.as_deref() {
                    Some(token) if self.session.expire_token(token) => {
                        warn!(target: "iotsoc::api", "401 from /{}; ending session", path.trim_start_matches('/'))
                    }
                    _ => debug!(target: "iotsoc::api", "401 from /{} for a session already gone", path.trim_start_matches('/')),
                }
                Err(AppError::unauthorized(LOGIN_PATH.to_string(), detail))
            }
            StatusCode::FORBIDDEN => Err(AppError::forbidden(detail)),
            StatusCode::NOT_FOUND => Err(AppError::not_found(detail)),
            other => Err(AppError::Rejected { status: other.as_u16(), message: detail }),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let resp = self.send::<()>(Method::GET, path, None).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(&self, path: &str, body: Option<&B>) -> AppResult<T> {
        let resp = self.send(Method::POST, path, body).await?;
        Ok(resp.json::<T>().await?)
    }

    /// Profile of the signed-in user as the backend sees it.
    pub async fn me(&self) -> AppResult<Identity> {
        let user: RemoteUser = self.get_json("auth/me").await?;
        user.into_identity().map_err(AppError::from)
    }

    pub async fn recent_packets(&self, limit: usize) -> AppResult<Vec<RecentPacket>> {
        self.get_json(&format!("dashboard/recent-packets?limit={limit}")).await
    }

    pub async fn recent_events(&self, limit: usize) -> AppResult<Vec<DetectionEvent>> {
        self.get_json(&format!("dashboard/recent-events?limit={limit}")).await
    }

    pub async fn alerts(&self) -> AppResult<Vec<serde_json::Value>> { self.get_json("dashboard/alerts").await }

    pub async fn traffic_features(&self) -> AppResult<Vec<serde_json::Value>> { self.get_json("traffic-features").await }

    pub async fn ports(&self) -> AppResult<Vec<SwitchPort>> { self.get_json("ports").await }

    pub async fn port(&self, port_id: &str) -> AppResult<SwitchPort> { self.get_json(&format!("ports/{port_id}")).await }

    /// Cut a switch port off the network. The reason is checked locally first.
    pub async fn isolate_port(&self, port_id: &str, request: &IsolateRequest) -> AppResult<SwitchPort> {
        request.validate().map_err(|m| AppError::Rejected { status: 422, message: m })?;
        self.post_json(&format!("ports/{port_id}/isolate"), Some(request)).await
    }

    pub async fn lift_isolation(&self, port_id: &str) -> AppResult<SwitchPort> {
        self.post_json::<_, ()>(&format!("ports/{port_id}/lift-isolation"), None).await
    }

    pub async fn seed_ports(&self) -> AppResult<serde_json::Value> { self.post_json::<_, ()>("ports/seed/sample", None).await }
}
