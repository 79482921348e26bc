//! The dashboard's route table and navigation.
//!
//! Everything except `/login` sits behind an any-authenticated guard; inside
//! it, `/users` additionally requires a super admin. A few legacy paths
//! redirect to their current pages before any guard runs.

use crate::identity::{GuardDecision, Location, RequiredRoles, Role, RouteGuard, Session, LOGIN_PATH};

pub const HOME_PATH: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    Login,
    Dashboard,
    SystemHealth,
    Packets,
    Alerts,
    Ports,
    Logs,
    Forensics,
    Users,
}

impl Page {
    pub const PROTECTED: [Page; 8] = [
        Page::Dashboard,
        Page::SystemHealth,
        Page::Packets,
        Page::Alerts,
        Page::Ports,
        Page::Logs,
        Page::Forensics,
        Page::Users,
    ];

    pub const fn path(self) -> &'static str {
        match self {
            Page::Login => LOGIN_PATH,
            Page::Dashboard => HOME_PATH,
            Page::SystemHealth => "/system-health",
            Page::Packets => "/packets",
            Page::Alerts => "/alerts",
            Page::Ports => "/ports",
            Page::Logs => "/logs",
            Page::Forensics => "/forensics",
            Page::Users => "/users",
        }
    }

    pub fn from_path(path: &str) -> Option<Page> {
        if path == LOGIN_PATH {
            return Some(Page::Login);
        }
        Page::PROTECTED.into_iter().find(|p| p.path() == path)
    }

    pub const fn title(self) -> &'static str {
        match self {
            Page::Login => "Sign in",
            Page::Dashboard => "Dashboard",
            Page::SystemHealth => "System Health",
            Page::Packets => "Live Packets",
            Page::Alerts => "Alerts",
            Page::Ports => "Ports",
            Page::Logs => "Logs",
            Page::Forensics => "Forensics",
            Page::Users => "User Management",
        }
    }

    pub fn is_public(self) -> bool { self == Page::Login }

    /// Roles the page asks for on top of being signed in.
    pub fn required_roles(self) -> RequiredRoles {
        match self {
            Page::Users => RequiredRoles::of([Role::SuperAdmin]),
            _ => RequiredRoles::any(),
        }
    }

    /// Whether the navigation menu should offer this page. The user
    /// management entry is only shown to super admins.
    pub fn nav_visible(self, session: &Session) -> bool {
        match self {
            Page::Login => !session.is_authenticated(),
            Page::Users => session.identity.as_ref().map(|i| i.role == Role::SuperAdmin).unwrap_or(false),
            _ => session.is_authenticated(),
        }
    }
}

/// Paths that permanently moved.
pub fn legacy_redirect(path: &str) -> Option<&'static str> {
    match path {
        "/" => Some(HOME_PATH),
        "/devices" => Some(Page::SystemHealth.path()),
        "/metrics" => Some(Page::Ports.path()),
        _ => None,
    }
}

/// Outcome of navigating to a location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    /// Session still loading; show the placeholder.
    Loading,
    /// Render this page at this location.
    Show { page: Page, location: Location },
    /// Go to `to` instead. `from` is set when the login guard sent us away.
    Redirect { to: Location, from: Option<Location> },
    Denied { page: Page, role: Role, role_label: &'static str },
    /// Signed in, but nothing lives at this path.
    NotFound { location: Location },
}

#[derive(Debug, Clone, Default)]
pub struct Router;

impl Router {
    pub fn new() -> Self { Self }

    pub fn navigate(&self, location: &Location, session: &Session) -> Navigation {
        if let Some(target) = legacy_redirect(&location.path) {
            return Navigation::Redirect { to: Location { path: target.to_string(), query: location.query.clone() }, from: None };
        }
        let page = Page::from_path(&location.path);
        if page == Some(Page::Login) {
            return Navigation::Show { page: Page::Login, location: location.clone() };
        }
        // outer guard: the whole protected area
        match RouteGuard::authenticated().check(session, location) {
            GuardDecision::Loading => return Navigation::Loading,
            GuardDecision::Redirect(r) => return Navigation::Redirect { to: r.to, from: Some(r.from) },
            GuardDecision::Denied(_) | GuardDecision::Allow => {}
        }
        let Some(page) = page else {
            return Navigation::NotFound { location: location.clone() };
        };
        match RouteGuard::new(page.required_roles()).check(session, location) {
            GuardDecision::Allow => Navigation::Show { page, location: location.clone() },
            GuardDecision::Denied(d) => Navigation::Denied { page, role: d.role, role_label: d.role_label },
            GuardDecision::Loading => Navigation::Loading,
            GuardDecision::Redirect(r) => Navigation::Redirect { to: r.to, from: Some(r.from) },
        }
    }

    /// Pages the menu should list for this session, in menu order.
    pub fn menu(&self, session: &Session) -> Vec<Page> {
        Page::PROTECTED.into_iter().filter(|p| p.nav_visible(session)).collect()
    }
}

/// Where to land after a successful login: back to where the guard
/// intercepted the visitor, or the dashboard.
pub fn post_login_target(from: Option<&Location>) -> Location {
    match from {
        Some(loc) if !loc.is_login() && legacy_redirect(&loc.path) != Some(HOME_PATH) => loc.clone(),
        _ => Location::new(HOME_PATH),
    }
}
