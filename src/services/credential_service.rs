//! Credential lookup (`username → secret`) and secret comparison.

use anyhow::{Result, anyhow};
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
};
use async_trait::async_trait;
use rand::rngs::OsRng;
use sqlx::SqlitePool;
use std::{collections::HashMap, sync::Arc};

const ARGON2_PREFIX: &str = "$argon2";

/// Source of stored secrets, keyed by username.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn secret_for(&self, username: &str) -> Result<Option<String>>;
}

/// Credentials kept in the `credentials` table.
#[derive(Clone)]
pub struct SqliteCredentials {
    db: Arc<SqlitePool>,
}

impl SqliteCredentials {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Insert or replace the secret for `username`.
    pub async fn upsert(&self, username: &str, secret: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO credentials (username, secret) VALUES (?, ?)
             ON CONFLICT(username) DO UPDATE SET secret = excluded.secret",
        )
        .bind(username)
        .bind(secret)
        .execute(&*self.db)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentials {
    async fn secret_for(&self, username: &str) -> Result<Option<String>> {
        let secret = sqlx::query_scalar::<_, String>(
            "SELECT secret FROM credentials WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&*self.db)
        .await?;
        Ok(secret)
    }
}

/// Fixed in-memory credential map.
#[derive(Clone, Default)]
pub struct StaticCredentials {
    secrets: HashMap<String, String>,
}

impl StaticCredentials {
    pub fn new<I, U, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (U, S)>,
        U: Into<String>,
        S: Into<String>,
    {
        Self {
            secrets: entries
                .into_iter()
                .map(|(u, s)| (u.into(), s.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl CredentialStore for StaticCredentials {
    async fn secret_for(&self, username: &str) -> Result<Option<String>> {
        Ok(self.secrets.get(username).cloned())
    }
}

/// Compare a supplied password with the stored secret.
///
/// Stored Argon2 PHC strings are verified with Argon2; anything else is
/// compared byte for byte. A malformed PHC string never matches.
pub fn secret_matches(supplied: &str, stored: &str) -> bool {
    if stored.starts_with(ARGON2_PREFIX) {
        return match PasswordHash::new(stored) {
            Ok(hash) => Argon2::default()
                .verify_password(supplied.as_bytes(), &hash)
                .is_ok(),
            Err(err) => {
                tracing::warn!("stored credential is not a valid PHC string: {}", err);
                false
            }
        };
    }
    supplied.as_bytes() == stored.as_bytes()
}

/// Produce an Argon2 PHC hash suitable for storing as a secret.
pub fn hash_secret(plain: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|err| anyhow!("hashing password: {}", err))?;
    Ok(hash.to_string())
}
