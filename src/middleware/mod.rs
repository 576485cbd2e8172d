//! Request/response middleware shared by every route.

pub mod auth;
pub mod cors;
pub mod logging;

pub use auth::{require_auth, verify_request};
pub use cors::{CORS_HEADERS, apply_cors_headers, preflight};
pub use logging::log_requests;
