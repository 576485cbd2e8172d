//! Bearer-token gate for mutating routes.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::{
    errors::AppError, models::auth::Claims, services::token_service::TokenService,
    state::AppState,
};

/// Extract and verify the bearer token carried in `headers`.
///
/// Fails with 401 when the header is missing, is not `Bearer <token>`, the
/// signature does not verify, or the token has expired.
pub fn verify_request(headers: &HeaderMap, tokens: &TokenService) -> Result<Claims, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::unauthorized("Missing or invalid authorization header"))?;

    Ok(tokens.verify(token.trim())?)
}

/// Wraps a handler (`handler.layer(from_fn_with_state(state, require_auth))`)
/// so it only runs for verified requests.
///
/// The request is forwarded unchanged apart from the verified [`Claims`],
/// which are inserted into its extensions. Nothing is cached; every request
/// is verified again.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match verify_request(request.headers(), &state.tokens) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(err) => {
            warn!(
                "rejected {} {}: {}",
                request.method(),
                request.uri().path(),
                err
            );
            err.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    fn headers(auth: Option<&str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(value) = auth {
            headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        }
        headers
    }

    #[test]
    fn accepts_valid_bearer_token() {
        let tokens = TokenService::new("gate-secret");
        let token = tokens.issue("alice").unwrap();
        let claims = verify_request(&headers(Some(&format!("Bearer {token}"))), &tokens).unwrap();
        assert_eq!(claims.username, "alice");
    }

    #[test]
    fn rejects_missing_and_malformed_headers() {
        let tokens = TokenService::new("gate-secret");
        let token = tokens.issue("alice").unwrap();

        for value in [None, Some(format!("Basic {token}")), Some(token.clone())] {
            let err = verify_request(&headers(value.as_deref()), &tokens).unwrap_err();
            assert_eq!(err.status, StatusCode::UNAUTHORIZED);
            assert_eq!(err.message, "Missing or invalid authorization header");
        }
    }

    #[test]
    fn rejects_expired_and_forged_tokens() {
        let tokens = TokenService::new("gate-secret");
        let expired = tokens.issue_at("alice", 0).unwrap();
        let err = verify_request(&headers(Some(&format!("Bearer {expired}"))), &tokens).unwrap_err();
        assert_eq!(err.message, "Token expired");

        let forged = TokenService::new("other-secret").issue("alice").unwrap();
        let err = verify_request(&headers(Some(&format!("Bearer {forged}"))), &tokens).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "Invalid token");
    }
}
