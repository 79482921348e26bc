//! Client-side core of the IoT security-operations dashboard.
//!
//! The dashboard itself is mostly presentation; what lives here is the part
//! with real state: who is signed in (`identity`), what they may see
//! (`identity::has_permission`, `identity::RouteGuard`), which pages exist
//! (`routes`), and the authenticated REST client the pages fetch through (`api`).

pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod routes;
pub mod storage;

pub use config::ConsoleConfig;
pub use error::{AppError, AppResult};
