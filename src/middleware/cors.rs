//! Fixed CORS policy applied to every response.

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::Response,
};

/// Process-wide CORS header set. Names must be lowercase.
pub const CORS_HEADERS: [(&str, &str); 4] = [
    ("access-control-allow-origin", "*"),
    ("access-control-allow-methods", "GET, POST, PUT, DELETE, OPTIONS"),
    ("access-control-allow-headers", "Content-Type, Authorization"),
    ("access-control-max-age", "86400"),
];

/// Response middleware (`map_response`) stamping the CORS headers onto
/// successes, errors and fallbacks alike.
pub async fn apply_cors_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    for (name, value) in CORS_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    response
}

/// `OPTIONS` preflight: empty 200; the CORS headers come from
/// [`apply_cors_headers`].
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}
