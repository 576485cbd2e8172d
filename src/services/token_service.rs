//! Signed access tokens (HS256 JWT) with a fixed one-hour lifetime.

use crate::models::auth::Claims;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

/// How long an issued token stays valid, in seconds.
pub const TOKEN_LIFETIME_SECS: i64 = 60 * 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error("token expired")]
    Expired,
    #[error("token signing failed: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Issues and verifies tokens with a shared HMAC secret.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against our own clock in `verify_at`, with no leeway.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a token for `username`, valid for [`TOKEN_LIFETIME_SECS`].
    pub fn issue(&self, username: &str) -> Result<String, TokenError> {
        self.issue_at(username, Utc::now().timestamp())
    }

    /// Issue a token as if the clock read `now` (seconds since the epoch).
    pub fn issue_at(&self, username: &str, now: i64) -> Result<String, TokenError> {
        let claims = Claims {
            sub: username.to_string(),
            username: username.to_string(),
            exp: now + TOKEN_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    /// Verify signature, then reject tokens whose `exp` is at or before `now`.
    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| TokenError::Invalid)?;
        if data.claims.exp <= now {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }
}
