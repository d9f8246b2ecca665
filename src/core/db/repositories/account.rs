//! Account repository
//!
//! Stores provider accounts linked to users (`provider` + `provider_account_id`).

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::db::models::{Account, LinkAccount};

const ACCOUNT_COLUMNS: &str = "id, user_id, type, provider, provider_account_id, refresh_token, \
     access_token, expires_at, token_type, scope, id_token, session_state";

#[derive(Debug, thiserror::Error)]
pub enum AccountRepositoryError {
    #[error("Account not found")]
    NotFound,

    #[error("Account already linked")]
    AlreadyLinked,

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Link a provider account to a user
    pub async fn link(&self, dto: &LinkAccount) -> Result<Account, AccountRepositoryError> {
        if self
            .find(&dto.provider, &dto.provider_account_id)
            .await?
            .is_some()
        {
            return Err(AccountRepositoryError::AlreadyLinked);
        }

        let account = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO accounts (id, user_id, type, provider, provider_account_id,
                                  refresh_token, access_token, expires_at, token_type,
                                  scope, id_token, session_state)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&dto.user_id)
        .bind(&dto.account_type)
        .bind(&dto.provider)
        .bind(&dto.provider_account_id)
        .bind(&dto.refresh_token)
        .bind(&dto.access_token)
        .bind(dto.expires_at)
        .bind(&dto.token_type)
        .bind(&dto.scope)
        .bind(&dto.id_token)
        .bind(&dto.session_state)
        .fetch_one(&self.pool)
        .await?;

        Ok(account)
    }

    pub async fn find(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<Account>, AccountRepositoryError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE provider = $1 AND provider_account_id = $2"
        ))
        .bind(provider)
        .bind(provider_account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Unlink a provider account
    pub async fn unlink(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<(), AccountRepositoryError> {
        let result =
            sqlx::query("DELETE FROM accounts WHERE provider = $1 AND provider_account_id = $2")
                .bind(provider)
                .bind(provider_account_id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AccountRepositoryError::NotFound);
        }

        Ok(())
    }
}
