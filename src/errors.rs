use axum::{
    Json,
    extract::rejection::{BytesRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

use crate::services::{object_store::StorageError, token_service::TokenError};

/// Message sent for every error that was not classified by a handler.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// An error that renders as the JSON envelope `{ "error": "<message>" }`.
///
/// CORS headers are attached to every response by the router's response
/// middleware, so this type only decides status and body.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    /// 401 Unauthorized
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn method_not_allowed() -> Self {
        Self::new(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

/// Unclassified failures are logged and flattened to a generic 500.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("unhandled error: {:#}", err);
        AppError::internal(INTERNAL_ERROR_MESSAGE)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(_) => AppError::bad_request("Invalid object key"),
            other => {
                tracing::error!("store error: {}", other);
                AppError::internal(INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::unauthorized("Token expired"),
            TokenError::Invalid => AppError::unauthorized("Invalid token"),
            TokenError::Signing(inner) => {
                tracing::error!("token signing failed: {}", inner);
                AppError::internal(INTERNAL_ERROR_MESSAGE)
            }
        }
    }
}

/// Extractor rejections keep their status but never expose axum's text.
impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        tracing::debug!("rejected query string: {}", rejection.body_text());
        AppError::bad_request("Invalid query string")
    }
}

impl From<BytesRejection> for AppError {
    fn from(rejection: BytesRejection) -> Self {
        tracing::debug!("rejected request body: {}", rejection.body_text());
        match rejection.status() {
            StatusCode::PAYLOAD_TOO_LARGE => {
                AppError::new(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large")
            }
            _ => AppError::bad_request("Failed to read request body"),
        }
    }
}
