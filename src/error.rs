//! Unified error model for the dashboard core.
//! `AuthError` is what a login attempt can fail with; `AppError` is what the
//! pages see from the API client and maps back onto HTTP status codes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::storage::StorageError;

/// Message shown for every credential failure. Unknown user and wrong
/// secret are deliberately indistinguishable.
pub const INVALID_CREDENTIALS_MSG: &str = "Invalid username or password";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("{}", INVALID_CREDENTIALS_MSG)]
    InvalidCredentials,
    /// A logout or a newer login landed while this attempt was in flight.
    #[error("login superseded by a newer session change")]
    Superseded,
    #[error("could not persist session: {0}")]
    Storage(String),
    #[error("authentication backend unavailable: {0}")]
    Backend(String),
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self { AuthError::Storage(err.to_string()) }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// 401 from the API. The session has already been cleared; `redirect`
    /// is where the caller should navigate.
    #[error("unauthorized: {message}")]
    Unauthorized { redirect: String, message: String },
    #[error("forbidden: {message}")]
    Forbidden { message: String },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("transport: {message}")]
    Transport { message: String },
    #[error("decode: {message}")]
    Decode { message: String },
    #[error("storage: {message}")]
    Storage { message: String },
    #[error("config: {message}")]
    Config { message: String },
}

impl AppError {
    pub fn unauthorized<S: Into<String>>(redirect: S, msg: S) -> Self { AppError::Unauthorized { redirect: redirect.into(), message: msg.into() } }
    pub fn forbidden<S: Into<String>>(msg: S) -> Self { AppError::Forbidden { message: msg.into() } }
    pub fn not_found<S: Into<String>>(msg: S) -> Self { AppError::NotFound { message: msg.into() } }
    pub fn transport<S: Into<String>>(msg: S) -> Self { AppError::Transport { message: msg.into() } }
    pub fn decode<S: Into<String>>(msg: S) -> Self { AppError::Decode { message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { AppError::Config { message: msg.into() } }

    /// Map back to the HTTP status the condition corresponds to.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::Unauthorized { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::NotFound { .. } => 404,
            AppError::Rejected { status, .. } => *status,
            AppError::Transport { .. } => 503,
            AppError::Decode { .. } => 502,
            AppError::Storage { .. } | AppError::Config { .. } => 500,
        }
    }

    /// True when the caller should abandon the page and show the login form.
    pub fn requires_login(&self) -> bool { matches!(self, AppError::Unauthorized { .. }) }
}

pub type AppResult<T> = Result<T, AppError>;

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => AppError::Rejected { status: 401, message: err.to_string() },
            AuthError::Superseded => AppError::Rejected { status: 409, message: err.to_string() },
            AuthError::Storage(message) => AppError::Storage { message },
            AuthError::Backend(message) => AppError::Transport { message },
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self { AppError::Storage { message: err.to_string() } }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() { AppError::decode(err.to_string()) } else { AppError::transport(err.to_string()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::unauthorized("/login", "expired").http_status(), 401);
        assert_eq!(AppError::forbidden("no").http_status(), 403);
        assert_eq!(AppError::not_found("port").http_status(), 404);
        assert_eq!(AppError::Rejected { status: 422, message: "bad".into() }.http_status(), 422);
        assert_eq!(AppError::transport("down").http_status(), 503);
        assert_eq!(AppError::decode("json").http_status(), 502);
    }

    #[test]
    fn credential_errors_share_one_message() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), INVALID_CREDENTIALS_MSG);
        let app: AppError = AuthError::InvalidCredentials.into();
        assert_eq!(app.http_status(), 401);
        assert!(!app.requires_login());
    }

    #[test]
    fn unauthorized_serializes_with_tag() {
        let v = serde_json::to_value(AppError::unauthorized("/login", "token expired")).unwrap();
        assert_eq!(v["type"], "unauthorized");
        assert_eq!(v["redirect"], "/login");
    }
}
