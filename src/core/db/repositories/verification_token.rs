//! Verification token repository
//!
//! One-time tokens (e-mail sign-in links and the like). Tokens are stored as
//! SHA-256 over `token + secret` and deleted when used.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;

use crate::core::db::models::VerificationToken;

#[derive(Debug, thiserror::Error)]
pub enum VerificationTokenRepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct VerificationTokenRepository {
    pool: PgPool,
    secret: String,
}

impl VerificationTokenRepository {
    pub fn new(pool: PgPool, secret: impl Into<String>) -> Self {
        Self {
            pool,
            secret: secret.into(),
        }
    }

    /// Hash a raw token with the repository secret
    pub fn hash_token(raw_token: &str, secret: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(raw_token.as_bytes());
        hasher.update(secret.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub async fn create(
        &self,
        identifier: &str,
        raw_token: &str,
        expires: DateTime<Utc>,
    ) -> Result<VerificationToken, VerificationTokenRepositoryError> {
        let token = sqlx::query_as::<_, VerificationToken>(
            r#"
            INSERT INTO verification_tokens (identifier, token, expires)
            VALUES ($1, $2, $3)
            RETURNING identifier, token, expires
            "#,
        )
        .bind(identifier)
        .bind(Self::hash_token(raw_token, &self.secret))
        .bind(expires)
        .fetch_one(&self.pool)
        .await?;

        Ok(token)
    }

    /// Consume a token: it is deleted whether or not it has expired.
    ///
    /// Returns `None` for unknown or expired tokens.
    pub async fn use_token(
        &self,
        identifier: &str,
        raw_token: &str,
    ) -> Result<Option<VerificationToken>, VerificationTokenRepositoryError> {
        let token = sqlx::query_as::<_, VerificationToken>(
            r#"
            DELETE FROM verification_tokens
            WHERE identifier = $1 AND token = $2
            RETURNING identifier, token, expires
            "#,
        )
        .bind(identifier)
        .bind(Self::hash_token(raw_token, &self.secret))
        .fetch_optional(&self.pool)
        .await?;

        Ok(token.filter(|t| !t.is_expired()))
    }

    pub async fn cleanup_expired(&self) -> Result<u64, VerificationTokenRepositoryError> {
        let result = sqlx::query("DELETE FROM verification_tokens WHERE expires < NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
