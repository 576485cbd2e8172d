//! Login and token verification.

use crate::{
    errors::AppError,
    models::auth::{LoginRequest, VerifyRequest},
    services::credential_service::secret_matches,
    state::AppState,
};
use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    response::IntoResponse,
};
use serde::de::DeserializeOwned;
use serde_json::json;

/// POST `/api/auth/login` — exchange `{username, password}` for a token.
pub async fn login(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req: LoginRequest = parse_body(&body?)?;
    let (Some(username), Some(password)) = (
        req.username.filter(|u| !u.is_empty()),
        req.password.filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::bad_request("Username and password are required"));
    };

    let stored = state
        .credentials
        .secret_for(&username)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid credentials"))?;

    if !secret_matches(&password, &stored) {
        tracing::warn!("failed login for `{}`", username);
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let token = state.tokens.issue(&username)?;
    tracing::info!("issued token for `{}`", username);
    Ok(Json(json!({ "token": token })))
}

/// POST `/api/auth/verify` — report whether `{token}` is currently valid.
pub async fn verify_token(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<impl IntoResponse, AppError> {
    let req: VerifyRequest = parse_body(&body?)?;
    let token = req
        .token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::bad_request("Token is required"))?;

    let claims = state.tokens.verify(&token)?;
    Ok(Json(json!({ "valid": true, "payload": claims })))
}

/// An empty body deserializes as the default request, so missing fields are
/// reported by the handler rather than as a parse error.
fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, AppError> {
    if body.is_empty() {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|_| AppError::bad_request("Invalid JSON body"))
}
