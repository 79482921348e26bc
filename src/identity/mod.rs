//! Identity, session and authorization for the dashboard.
//! Keep the public surface thin and split implementation across sub-modules.

mod authenticator;
mod authorizer;
mod guard;
mod principal;
mod provider;
mod role;
mod session;
pub mod token;

pub use authenticator::Authenticator;
pub use authorizer::{has_permission, RequiredRoles};
pub use guard::{AccessDenied, BackAction, GuardDecision, GuardView, Location, Redirect, RouteGuard, LOGIN_PATH};
pub use principal::{parse_timestamp, Identity};
pub use provider::{
    hash_secret, verify_secret, CredentialRecord, CredentialSource, DemoCredentials, HashedCredentials, RemoteCredentials,
    RemoteUser, TokenResponse, Verified,
};
pub use role::{Role, UnknownRole};
pub use session::{Session, SessionLoadError, SessionPhase, SessionStore, SubscriptionId};
