//! Session repository for server-side session records
//!
//! Part of the adapter contract. The signed-token strategy does not consult
//! these rows per request, but the adapter still has to store them.
//! Tokens are stored as SHA-256 hashes.

use chrono::{DateTime, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::core::db::models::SessionRecord;

/// Session repository error types
#[derive(Debug, thiserror::Error)]
pub enum SessionRepositoryError {
    #[error("Session not found")]
    NotFound,

    #[error("Session expired")]
    Expired,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Session repository for database operations
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Hash a token using SHA-256
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Generate a random session token (32 bytes, hex encoded)
    pub fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Store a session; only the hash of `raw_token` is persisted
    pub async fn create(
        &self,
        user_id: &str,
        raw_token: &str,
        expires: DateTime<Utc>,
    ) -> Result<SessionRecord, SessionRepositoryError> {
        let session = sqlx::query_as::<_, SessionRecord>(
            r#"
            INSERT INTO sessions (id, session_token, user_id, expires)
            VALUES ($1, $2, $3, $4)
            RETURNING id, session_token, user_id, expires
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(Self::hash_token(raw_token))
        .bind(user_id)
        .bind(expires)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    /// Find a session by raw token (hashed for lookup)
    pub async fn find_by_token(
        &self,
        raw_token: &str,
    ) -> Result<Option<SessionRecord>, SessionRepositoryError> {
        let session = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT id, session_token, user_id, expires
            FROM sessions
            WHERE session_token = $1
            "#,
        )
        .bind(Self::hash_token(raw_token))
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Return the session if it exists and has not expired.
    ///
    /// Expired sessions are deleted and reported as `Expired`.
    pub async fn validate_token(
        &self,
        raw_token: &str,
    ) -> Result<Option<SessionRecord>, SessionRepositoryError> {
        let Some(session) = self.find_by_token(raw_token).await? else {
            return Ok(None);
        };

        if session.expires < Utc::now() {
            self.delete_by_token(raw_token).await?;
            return Err(SessionRepositoryError::Expired);
        }

        Ok(Some(session))
    }

    /// Move a session's expiry
    pub async fn update_expiry(
        &self,
        raw_token: &str,
        expires: DateTime<Utc>,
    ) -> Result<SessionRecord, SessionRepositoryError> {
        let session = sqlx::query_as::<_, SessionRecord>(
            r#"
            UPDATE sessions
            SET expires = $2
            WHERE session_token = $1
            RETURNING id, session_token, user_id, expires
            "#,
        )
        .bind(Self::hash_token(raw_token))
        .bind(expires)
        .fetch_optional(&self.pool)
        .await?;

        session.ok_or(SessionRepositoryError::NotFound)
    }

    /// Delete a session by raw token
    pub async fn delete_by_token(&self, raw_token: &str) -> Result<bool, SessionRepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE session_token = $1")
            .bind(Self::hash_token(raw_token))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Clean up expired sessions
    pub async fn cleanup_expired(&self) -> Result<u64, SessionRepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires < NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_produces_consistent_hash() {
        let hash1 = SessionRepository::hash_token("session_token_12345");
        let hash2 = SessionRepository::hash_token("session_token_12345");

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_hash_token_different_tokens() {
        assert_ne!(
            SessionRepository::hash_token("token_a"),
            SessionRepository::hash_token("token_b")
        );
    }

    #[test]
    fn test_hash_token_known_value() {
        // SHA-256 of the empty string
        assert_eq!(
            SessionRepository::hash_token(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_generate_token_is_random_hex() {
        let a = SessionRepository::generate_token();
        let b = SessionRepository::generate_token();

        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_repository_error_display() {
        assert_eq!(SessionRepositoryError::NotFound.to_string(), "Session not found");
        assert_eq!(SessionRepositoryError::Expired.to_string(), "Session expired");
    }

    #[tokio::test]
    #[ignore = "requires running PostgreSQL database"]
    async fn test_session_lifecycle() {
        use crate::core::db::models::{CreateUser, Role};
        use crate::core::db::pool::{DbConfig, create_pool_with_migrations};
        use crate::core::db::repositories::UserRepository;

        let config = DbConfig::from_env().expect("DATABASE_URL must be set for tests");
        let pool = create_pool_with_migrations(&config).await.unwrap();
        let users = UserRepository::new(pool.clone());
        let sessions = SessionRepository::new(pool);

        let unique = Uuid::new_v4().simple().to_string();
        let user = users
            .create(&CreateUser {
                email: format!("sess_{}@example.com", &unique[..12]),
                email_verified: None,
                name: None,
                image: None,
                role: Role::Admin,
            })
            .await
            .unwrap();

        let raw = SessionRepository::generate_token();
        let expires = Utc::now() + chrono::Duration::days(1);
        let created = sessions.create(&user.id, &raw, expires).await.unwrap();
        assert_ne!(created.session_token, raw);

        let found = sessions.validate_token(&raw).await.unwrap().unwrap();
        assert_eq!(found.user_id, user.id);

        let past = Utc::now() - chrono::Duration::minutes(5);
        sessions.update_expiry(&raw, past).await.unwrap();
        assert!(matches!(
            sessions.validate_token(&raw).await,
            Err(SessionRepositoryError::Expired)
        ));
        assert!(sessions.find_by_token(&raw).await.unwrap().is_none());

        users.delete(&user.id).await.unwrap();
    }
}
