//! PostgreSQL adapter
//!
//! The persistence interface the auth layer is built on: users, linked
//! provider accounts, server-side sessions and verification tokens. Each
//! operation delegates to the matching repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::core::auth::callbacks::UserLookup;
use crate::core::auth::service::CredentialsAuthorizer;
use crate::core::db::models::{
    Account, CreateUser, LinkAccount, SessionRecord, TokenUser, UpdateUser, User,
    VerificationToken,
};
use crate::core::db::repositories::{
    AccountRepository, AccountRepositoryError, SessionRepository, SessionRepositoryError,
    UserRepository, UserRepositoryError, VerificationTokenRepository,
    VerificationTokenRepositoryError,
};

/// Adapter error types
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error(transparent)]
    User(#[from] UserRepositoryError),

    #[error(transparent)]
    Account(#[from] AccountRepositoryError),

    #[error(transparent)]
    Session(#[from] SessionRepositoryError),

    #[error(transparent)]
    VerificationToken(#[from] VerificationTokenRepositoryError),
}

/// Rows removed by [`PgAdapter::purge_expired`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpiredRows {
    pub sessions: u64,
    pub verification_tokens: u64,
}

impl ExpiredRows {
    pub fn total(&self) -> u64 {
        self.sessions + self.verification_tokens
    }
}

/// Database adapter backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgAdapter {
    users: UserRepository,
    accounts: AccountRepository,
    sessions: SessionRepository,
    verification_tokens: VerificationTokenRepository,
}

impl PgAdapter {
    /// `secret` salts stored verification tokens
    pub fn new(pool: PgPool, secret: impl Into<String>) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            accounts: AccountRepository::new(pool.clone()),
            sessions: SessionRepository::new(pool.clone()),
            verification_tokens: VerificationTokenRepository::new(pool, secret),
        }
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    // ------------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------------

    pub async fn create_user(&self, user: &CreateUser) -> Result<User, AdapterError> {
        Ok(self.users.create(user).await?)
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AdapterError> {
        Ok(self.users.find_by_id(id).await?)
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, AdapterError> {
        Ok(self.users.find_by_email(email).await?)
    }

    pub async fn get_user_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<User>, AdapterError> {
        Ok(self
            .users
            .find_by_account(provider, provider_account_id)
            .await?)
    }

    pub async fn update_user(&self, id: &str, updates: &UpdateUser) -> Result<User, AdapterError> {
        Ok(self.users.update(id, updates).await?)
    }

    /// Accounts, sessions and the role profile go with the user
    pub async fn delete_user(&self, id: &str) -> Result<bool, AdapterError> {
        Ok(self.users.delete(id).await?)
    }

    // ------------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------------

    pub async fn link_account(&self, account: &LinkAccount) -> Result<Account, AdapterError> {
        Ok(self.accounts.link(account).await?)
    }

    pub async fn get_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<Account>, AdapterError> {
        Ok(self.accounts.find(provider, provider_account_id).await?)
    }

    pub async fn unlink_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<(), AdapterError> {
        Ok(self.accounts.unlink(provider, provider_account_id).await?)
    }

    // ------------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------------

    /// Fresh random value for [`PgAdapter::create_session`]
    pub fn generate_session_token(&self) -> String {
        SessionRepository::generate_token()
    }

    pub async fn create_session(
        &self,
        user_id: &str,
        session_token: &str,
        expires: DateTime<Utc>,
    ) -> Result<SessionRecord, AdapterError> {
        Ok(self.sessions.create(user_id, session_token, expires).await?)
    }

    /// `None` for unknown and expired sessions; expired rows are removed
    pub async fn get_session_and_user(
        &self,
        session_token: &str,
    ) -> Result<Option<(SessionRecord, User)>, AdapterError> {
        let session = match self.sessions.validate_token(session_token).await {
            Ok(Some(session)) => session,
            Ok(None) | Err(SessionRepositoryError::Expired) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let user = self.users.find_by_id(&session.user_id).await?;

        Ok(user.map(|user| (session, user)))
    }

    pub async fn update_session(
        &self,
        session_token: &str,
        expires: DateTime<Utc>,
    ) -> Result<SessionRecord, AdapterError> {
        Ok(self.sessions.update_expiry(session_token, expires).await?)
    }

    pub async fn delete_session(&self, session_token: &str) -> Result<bool, AdapterError> {
        Ok(self.sessions.delete_by_token(session_token).await?)
    }

    // ------------------------------------------------------------------------
    // Verification tokens
    // ------------------------------------------------------------------------

    pub async fn create_verification_token(
        &self,
        identifier: &str,
        token: &str,
        expires: DateTime<Utc>,
    ) -> Result<VerificationToken, AdapterError> {
        Ok(self
            .verification_tokens
            .create(identifier, token, expires)
            .await?)
    }

    /// Single use: the token is gone after this call
    pub async fn use_verification_token(
        &self,
        identifier: &str,
        token: &str,
    ) -> Result<Option<VerificationToken>, AdapterError> {
        Ok(self.verification_tokens.use_token(identifier, token).await?)
    }

    // ------------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------------

    /// Delete expired sessions and verification tokens
    pub async fn purge_expired(&self) -> Result<ExpiredRows, AdapterError> {
        let sessions = self.sessions.cleanup_expired().await?;
        let verification_tokens = self.verification_tokens.cleanup_expired().await?;

        Ok(ExpiredRows {
            sessions,
            verification_tokens,
        })
    }
}

#[async_trait]
impl UserLookup for PgAdapter {
    type Error = UserRepositoryError;

    async fn find_for_token(&self, id: &str) -> Result<Option<TokenUser>, Self::Error> {
        self.users.find_for_token(id).await
    }
}

#[async_trait]
impl CredentialsAuthorizer for PgAdapter {
    type Error = UserRepositoryError;

    async fn authorize(&self, email: &str, password: &str) -> Result<Option<String>, Self::Error> {
        let user = self.users.authenticate(email, password).await?;
        Ok(user.map(|u| u.id))
    }
}
