//! Request logging middleware.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;
    info!("{} {} -> {}", method, uri, response.status());

    response
}
