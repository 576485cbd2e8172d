//! Route table for the file API.
//!
//! ## Structure
//! - `*       /health`              liveness probe
//! - `GET     /api/files`           list objects (`?path=` prefix filter)
//! - `GET     /api/files/{*key}`    serve object inline
//! - `POST    /api/files/{*key}`    upload raw bytes (auth)
//! - `DELETE  /api/files/{*key}`    delete object (auth)
//! - `GET     /api/details/{*key}`  object metadata
//! - `GET     /api/download/{*key}` download as attachment
//! - `POST    /api/move/{*key}`     move to `{destination}` (auth)
//! - `POST    /api/copy/{*key}`     copy to `{destination}` (auth)
//! - `POST    /api/auth/login`      issue a token
//! - `POST    /api/auth/verify`     check a token
//!
//! The wildcard `*key` allows nested keys like `photos/2025/img.jpg`. A path
//! that matches with the wrong method gets a JSON 405 before any handler or
//! auth check runs; anything unmatched gets a JSON 404. Every response passes
//! through the CORS middleware.

use crate::{
    handlers::{
        auth_handlers::{login, verify_token},
        file_handlers::{
            copy_file, delete_file, download_file, file_details, list_files, move_file,
            serve_file, upload_file,
        },
        health_handlers::{healthz, method_not_allowed, not_found},
    },
    middleware::{apply_cors_headers, log_requests, preflight, require_auth},
    state::AppState,
};
use axum::{
    Router,
    handler::Handler,
    middleware::{from_fn, from_fn_with_state, map_response},
    routing::{any, get, post},
};

/// Build the application router with its state attached.
///
/// Each wildcard route is also mounted at its bare prefix (`/api/files/`),
/// since `{*key}` never matches an empty remainder; those requests reach the
/// handlers with the root key `""`.
pub fn routes(state: AppState) -> Router {
    let auth = || from_fn_with_state(state.clone(), require_auth);

    let files = get(serve_file)
        .post(upload_file.layer(auth()))
        .delete(delete_file.layer(auth()))
        .options(preflight)
        .fallback(method_not_allowed);
    let details = get(file_details).fallback(method_not_allowed);
    let download = get(download_file).fallback(method_not_allowed);
    let move_route = post(move_file.layer(auth()))
        .options(preflight)
        .fallback(method_not_allowed);
    let copy_route = post(copy_file.layer(auth()))
        .options(preflight)
        .fallback(method_not_allowed);

    Router::new()
        .route("/health", any(healthz))
        .route("/api/files", get(list_files).fallback(method_not_allowed))
        .route("/api/files/", files.clone())
        .route("/api/files/{*key}", files)
        .route("/api/details/", details.clone())
        .route("/api/details/{*key}", details)
        .route("/api/download/", download.clone())
        .route("/api/download/{*key}", download)
        .route("/api/move/", move_route.clone())
        .route("/api/move/{*key}", move_route)
        .route("/api/copy/", copy_route.clone())
        .route("/api/copy/{*key}", copy_route)
        .route(
            "/api/auth/login",
            post(login).options(preflight).fallback(method_not_allowed),
        )
        .route(
            "/api/auth/verify",
            post(verify_token)
                .options(preflight)
                .fallback(method_not_allowed),
        )
        .fallback(not_found)
        .layer(map_response(apply_cors_headers))
        .layer(from_fn(log_requests))
        .with_state(state)
}
