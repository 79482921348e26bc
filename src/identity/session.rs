//! The session store: current identity, its persistence, and change notification.
//!
//! Lifecycle: `new` starts in `Loading`; `initialize` reads the persisted
//! identity/token pair once and lands in `Authenticated` or `Unauthenticated`,
//! clearing anything it cannot parse. `login`, `logout` and `expire` move
//! between the two settled phases and rewrite (or clear) storage.
//!
//! Every login start and every logout/expiry bumps a generation counter.
//! A login whose generation is stale once its credential check returns is
//! dropped as `AuthError::Superseded` and persists nothing, so the most
//! recent session change always wins.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::authenticator::Authenticator;
use super::authorizer::{has_permission, RequiredRoles};
use super::principal::Identity;
use super::token;
use crate::config::ConsoleConfig;
use crate::error::AuthError;
use crate::storage::{ClientStorage, StorageError, TOKEN_KEY, USER_KEY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    Unauthenticated,
    Authenticated,
}

/// What readers of the store see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub identity: Option<Identity>,
    pub is_loading: bool,
}

impl Session {
    pub fn loading() -> Self { Self { identity: None, is_loading: true } }

    pub fn anonymous() -> Self { Self { identity: None, is_loading: false } }

    pub fn signed_in(identity: Identity) -> Self { Self { identity: Some(identity), is_loading: false } }

    pub fn is_authenticated(&self) -> bool { self.identity.is_some() }

    pub fn phase(&self) -> SessionPhase {
        match (&self.identity, self.is_loading) {
            (_, true) => SessionPhase::Loading,
            (Some(_), false) => SessionPhase::Authenticated,
            (None, false) => SessionPhase::Unauthenticated,
        }
    }

    pub fn has_permission(&self, required: &RequiredRoles) -> bool { has_permission(self.identity.as_ref(), required) }
}

/// Why a persisted session was discarded at initialization. Logged, never returned.
#[derive(Debug, Error)]
pub enum SessionLoadError {
    #[error("persisted identity is malformed: {0}")]
    CorruptedSession(#[from] serde_json::Error),
    #[error("only one of identity/token is persisted")]
    Incomplete,
    #[error("storage unreadable: {0}")]
    Storage(#[from] StorageError),
}

pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&Session) + Send + Sync>;

#[derive(Debug)]
struct Inner {
    phase: SessionPhase,
    identity: Option<Identity>,
    token: Option<String>,
    generation: u64,
}

pub struct SessionStore {
    storage: Arc<dyn ClientStorage>,
    authenticator: Authenticator,
    token_ttl: Duration,
    inner: RwLock<Inner>,
    listeners: Mutex<BTreeMap<SubscriptionId, Listener>>,
    next_listener: Mutex<SubscriptionId>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("SessionStore")
            .field("phase", &inner.phase)
            .field("user", &inner.identity.as_ref().map(|i| i.username.as_str()))
            .field("generation", &inner.generation)
            .finish()
    }
}

impl SessionStore {
    pub fn new(storage: Arc<dyn ClientStorage>, authenticator: Authenticator, config: &ConsoleConfig) -> Self {
        Self {
            storage,
            authenticator,
            token_ttl: config.token_ttl,
            inner: RwLock::new(Inner { phase: SessionPhase::Loading, identity: None, token: None, generation: 0 }),
            listeners: Mutex::new(BTreeMap::new()),
            next_listener: Mutex::new(0),
        }
    }

    /// `new` followed by `initialize`.
    pub async fn open(storage: Arc<dyn ClientStorage>, authenticator: Authenticator, config: &ConsoleConfig) -> Arc<Self> {
        let store = Arc::new(Self::new(storage, authenticator, config));
        store.initialize().await;
        store
    }

    /// Leave `Loading` by restoring the persisted session, or by clearing it
    /// if it cannot be restored. Later calls do nothing.
    pub async fn initialize(&self) {
        if self.inner.read().phase != SessionPhase::Loading {
            return;
        }
        let restored = self.read_persisted();
        let session = {
            let mut inner = self.inner.write();
            if inner.phase != SessionPhase::Loading {
                // a login or logout settled the store while we were reading
                return;
            }
            match restored {
                Ok(Some((identity, token))) => {
                    info!(target: "iotsoc::session", "restored session user={} role={}", identity.username, identity.role);
                    inner.identity = Some(identity);
                    inner.token = Some(token);
                    inner.phase = SessionPhase::Authenticated;
                }
                Ok(None) => {
                    debug!(target: "iotsoc::session", "no persisted session");
                    inner.phase = SessionPhase::Unauthenticated;
                }
                Err(e) => {
                    warn!(target: "iotsoc::session", "discarding persisted session: {}", e);
                    self.clear_persisted();
                    inner.phase = SessionPhase::Unauthenticated;
                }
            }
            Self::view(&inner)
        };
        self.notify(&session);
    }

    fn read_persisted(&self) -> Result<Option<(Identity, String)>, SessionLoadError> {
        let user = self.storage.get(USER_KEY)?;
        let token = self.storage.get(TOKEN_KEY)?;
        match (user, token) {
            (None, None) => Ok(None),
            (Some(user), Some(token)) => Ok(Some((serde_json::from_str::<Identity>(&user)?, token))),
            _ => Err(SessionLoadError::Incomplete),
        }
    }

    fn clear_persisted(&self) {
        for key in [USER_KEY, TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(target: "iotsoc::session", "could not clear {}: {}", key, e);
            }
        }
    }

    fn persist(&self, identity: &Identity, token: &str) -> Result<(), AuthError> {
        let json = serde_json::to_string(identity).map_err(|e| AuthError::Storage(e.to_string()))?;
        if let Err(e) = self.storage.set(USER_KEY, &json).and_then(|_| self.storage.set(TOKEN_KEY, token)) {
            self.clear_persisted();
            return Err(e.into());
        }
        Ok(())
    }

    fn view(inner: &Inner) -> Session {
        Session { identity: inner.identity.clone(), is_loading: inner.phase == SessionPhase::Loading }
    }

    /// Check credentials and, on success, persist and publish the new identity.
    /// The returned error's `Display` is the message to show the user.
    pub async fn login(&self, login_name: &str, secret: &str) -> Result<Identity, AuthError> {
        let ticket = {
            let mut inner = self.inner.write();
            inner.generation += 1;
            inner.generation
        };
        let verified = self.authenticator.login(login_name, secret).await?;
        let (session, outcome) = {
            let mut inner = self.inner.write();
            if inner.generation != ticket {
                info!(target: "iotsoc::session", "dropping superseded login user={}", verified.identity.username);
                return Err(AuthError::Superseded);
            }
            let token = verified
                .token
                .unwrap_or_else(|| token::synthesize(&verified.identity, Utc::now(), self.token_ttl));
            match self.persist(&verified.identity, &token) {
                Ok(()) => {
                    inner.identity = Some(verified.identity.clone());
                    inner.token = Some(token);
                    inner.phase = SessionPhase::Authenticated;
                    (Self::view(&inner), Ok(verified.identity))
                }
                Err(e) => {
                    warn!(target: "iotsoc::session", "could not persist login user={}: {}", verified.identity.username, e);
                    if inner.identity.is_none() || self.restore_previous(&inner) {
                        return Err(e);
                    }
                    // storage lost the earlier session, so memory drops it too
                    if let Some(prev) = inner.identity.take() {
                        info!(target: "iotsoc::session", "session ended user={} reason=storage", prev.username);
                    }
                    inner.token = None;
                    inner.phase = SessionPhase::Unauthenticated;
                    inner.generation += 1;
                    (Self::view(&inner), Err(e))
                }
            }
        };
        self.notify(&session);
        outcome
    }

    /// Write the signed-in pair back after a failed login cleared storage.
    /// False when there was nothing to restore or the rewrite failed too.
    fn restore_previous(&self, inner: &Inner) -> bool {
        let (Some(identity), Some(token)) = (&inner.identity, &inner.token) else {
            return false;
        };
        match self.persist(identity, token) {
            Ok(()) => true,
            Err(e) => {
                warn!(target: "iotsoc::session", "could not restore session user={}: {}", identity.username, e);
                false
            }
        }
    }

    /// Sign out. Cancels any login still in flight. Idempotent.
    pub fn logout(&self) {
        self.end_session("logout", None);
    }

    /// The reaction to a 401 from the API: same effect as `logout`.
    pub fn expire(&self) {
        self.end_session("expired", None);
    }

    /// `expire`, but only while `token` is still the session's token. A 401
    /// answering a request sent under an earlier session leaves the current
    /// one alone. Returns whether the session was ended.
    pub fn expire_token(&self, token: &str) -> bool { self.end_session("expired", Some(token)) }

    fn end_session(&self, reason: &str, only_token: Option<&str>) -> bool {
        let (session, changed) = {
            let mut inner = self.inner.write();
            if let Some(expected) = only_token {
                if inner.token.as_deref() != Some(expected) {
                    debug!(target: "iotsoc::session", "ignoring {} for a token no longer in use", reason);
                    return false;
                }
            }
            inner.generation += 1;
            self.clear_persisted();
            let changed = inner.identity.is_some() || inner.phase == SessionPhase::Loading;
            if let Some(ident) = inner.identity.take() {
                info!(target: "iotsoc::session", "session ended user={} reason={}", ident.username, reason);
            }
            inner.token = None;
            inner.phase = SessionPhase::Unauthenticated;
            (Self::view(&inner), changed)
        };
        if changed {
            self.notify(&session);
        }
        changed
    }

    pub fn snapshot(&self) -> Session { Self::view(&self.inner.read()) }

    pub fn phase(&self) -> SessionPhase { self.inner.read().phase }

    pub fn identity(&self) -> Option<Identity> { self.inner.read().identity.clone() }

    /// Bearer token for API calls, if signed in.
    pub fn token(&self) -> Option<String> { self.inner.read().token.clone() }

    pub fn is_authenticated(&self) -> bool { self.inner.read().phase == SessionPhase::Authenticated }

    pub fn is_loading(&self) -> bool { self.inner.read().phase == SessionPhase::Loading }

    pub fn has_permission(&self, required: &RequiredRoles) -> bool { has_permission(self.inner.read().identity.as_ref(), required) }

    /// Register a listener called with the new session after every change.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&Session) + Send + Sync + 'static,
    {
        let id = {
            let mut next = self.next_listener.lock();
            *next += 1;
            *next
        };
        self.listeners.lock().insert(id, Arc::new(listener));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool { self.listeners.lock().remove(&id).is_some() }

    fn notify(&self, session: &Session) {
        // listeners run outside the lock so they may call back into the store
        let listeners: Vec<Listener> = self.listeners.lock().values().cloned().collect();
        for l in listeners {
            l(session);
        }
    }
}
