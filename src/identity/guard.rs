use std::fmt::{Display, Formatter};

use super::authorizer::RequiredRoles;
use super::role::Role;
use super::session::Session;

/// Entry point unauthenticated visitors are sent to.
pub const LOGIN_PATH: &str = "/login";

/// A navigable location: path plus optional query string (without `?`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub path: String,
    pub query: Option<String>,
}

impl Location {
    pub fn new<S: Into<String>>(path: S) -> Self {
        let raw: String = path.into();
        match raw.split_once('?') {
            Some((p, q)) if !q.is_empty() => Self { path: normalize_path(p), query: Some(q.to_string()) },
            Some((p, _)) => Self { path: normalize_path(p), query: None },
            None => Self { path: normalize_path(&raw), query: None },
        }
    }

    pub fn login() -> Self { Self::new(LOGIN_PATH) }

    pub fn is_login(&self) -> bool { self.path == LOGIN_PATH }
}

fn normalize_path(p: &str) -> String {
    let trimmed = p.trim();
    let body = trimmed.trim_end_matches('/');
    if body.is_empty() {
        "/".to_string()
    } else if body.starts_with('/') {
        body.to_string()
    } else {
        format!("/{body}")
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.query {
            Some(q) => write!(f, "{}?{}", self.path, q),
            None => f.write_str(&self.path),
        }
    }
}

impl From<&str> for Location {
    fn from(s: &str) -> Self { Location::new(s) }
}

/// Send the visitor to the login page, remembering where they were headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: Location,
    pub from: Location,
}

/// The "go back" control on the access-denied view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackAction {
    HistoryBack,
}

/// In-place refusal; the protected content is not rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDenied {
    pub role: Role,
    pub role_label: &'static str,
    pub back: BackAction,
}

impl AccessDenied {
    fn for_role(role: Role) -> Self { Self { role, role_label: role.label(), back: BackAction::HistoryBack } }

    pub fn message(&self) -> &'static str { "You don't have permission to access this page." }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not settled yet; show the placeholder and decide nothing.
    Loading,
    Redirect(Redirect),
    Denied(AccessDenied),
    Allow,
}

/// What the guarded region renders as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView<V> {
    Loading,
    Redirect(Redirect),
    Denied(AccessDenied),
    Content(V),
}

impl<V> GuardView<V> {
    pub fn content(self) -> Option<V> {
        match self {
            GuardView::Content(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_content(&self) -> bool { matches!(self, GuardView::Content(_)) }
}

/// Gate in front of a protected region. Holds no state beyond its
/// requirement; every decision is made from the session passed in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteGuard {
    required: RequiredRoles,
}

impl RouteGuard {
    pub fn new(required: RequiredRoles) -> Self { Self { required } }

    /// Any signed-in identity passes.
    pub fn authenticated() -> Self { Self::default() }

    pub fn required(&self) -> &RequiredRoles { &self.required }

    pub fn check(&self, session: &Session, location: &Location) -> GuardDecision {
        if session.is_loading {
            return GuardDecision::Loading;
        }
        let Some(identity) = session.identity.as_ref() else {
            return GuardDecision::Redirect(Redirect { to: Location::login(), from: location.clone() });
        };
        if !self.required.is_empty() && !session.has_permission(&self.required) {
            return GuardDecision::Denied(AccessDenied::for_role(identity.role));
        }
        GuardDecision::Allow
    }

    /// Render `children` only if the session passes the guard.
    pub fn render<V, F>(&self, session: &Session, location: &Location, children: F) -> GuardView<V>
    where
        F: FnOnce() -> V,
    {
        match self.check(session, location) {
            GuardDecision::Loading => GuardView::Loading,
            GuardDecision::Redirect(r) => GuardView::Redirect(r),
            GuardDecision::Denied(d) => GuardView::Denied(d),
            GuardDecision::Allow => GuardView::Content(children()),
        }
    }
}
