//! Health probe and the router's fallbacks.

use crate::{errors::AppError, middleware::preflight};
use axum::{
    Json,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// `/health` (any method)
///
/// Liveness probe; always 200 with `{"status":"ok"}` and never touches a
/// collaborator.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// Path matched, method did not.
pub async fn method_not_allowed() -> AppError {
    AppError::method_not_allowed()
}

/// Nothing matched. `OPTIONS` anywhere under `/api/auth/` is still answered
/// as a preflight.
pub async fn not_found(method: Method, uri: Uri) -> Response {
    if method == Method::OPTIONS && uri.path().starts_with("/api/auth/") {
        return preflight().await.into_response();
    }
    AppError::not_found("Not Found").into_response()
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}
