//! Path-addressed file management API.
//!
//! A small REST surface (list, details, serve, download, upload, delete,
//! move, copy) over an [`ObjectStore`](services::object_store::ObjectStore),
//! with bearer-token authentication on every mutating route.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::routes::routes;
pub use state::AppState;
