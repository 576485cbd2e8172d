//! Token claims and JSON request bodies.

use serde::{Deserialize, Serialize};

/// Claims carried by a signed access token.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Claims {
    /// Subject; the username the token was issued to.
    pub sub: String,
    pub username: String,
    /// Expiry as seconds since the Unix epoch.
    pub exp: i64,
}

/// Body of `POST /api/auth/login`.
#[derive(Deserialize, Debug, Default)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Body of `POST /api/auth/verify`.
#[derive(Deserialize, Debug, Default)]
pub struct VerifyRequest {
    #[serde(default)]
    pub token: Option<String>,
}

/// Body of the move and copy routes.
#[derive(Deserialize, Debug, Default)]
pub struct TransferRequest {
    #[serde(default)]
    pub destination: Option<String>,
}
