//! Authentication service
//!
//! Runs the session strategy: credentials sign-in, token verification and
//! refresh, and the `jwt`/`session` hooks around each of them.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::auth::callbacks::{AuthCallbacks, UserLookup};
use crate::core::auth::jwt::{JwtError, JwtService, SignedToken, Token};
use crate::core::auth::session::Session;

/// Checks sign-in credentials.
#[async_trait]
pub trait CredentialsAuthorizer: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the user id when the credentials are valid
    async fn authorize(&self, email: &str, password: &str) -> Result<Option<String>, Self::Error>;
}

/// Authentication service error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("User store error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl AuthError {
    pub(crate) fn store<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        tracing::error!("User store failure: {}", err);
        AuthError::Store(Box::new(err))
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::TokenExpired,
            JwtError::InvalidToken | JwtError::DecodingError(_) => AuthError::InvalidToken,
            _ => AuthError::InternalError(err.to_string()),
        }
    }
}

/// Sign-in request data
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// A materialized session plus the signed token backing it
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub session: Session,
    pub token: SignedToken,
}

/// Authentication service
pub struct AuthService<S> {
    store: Arc<S>,
    jwt: JwtService,
    callbacks: AuthCallbacks<S>,
}

impl<S> Clone for AuthService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            jwt: self.jwt.clone(),
            callbacks: self.callbacks.clone(),
        }
    }
}

impl<S> AuthService<S>
where
    S: UserLookup + CredentialsAuthorizer,
{
    /// Create a new authentication service
    pub fn new(store: Arc<S>, jwt: JwtService, debug: bool) -> Self {
        let callbacks = AuthCallbacks::new(Arc::clone(&store)).debug(debug);

        Self {
            store,
            jwt,
            callbacks,
        }
    }

    /// Validate email format
    fn validate_email(email: &str) -> Result<(), AuthError> {
        let Some((local, domain)) = email.split_once('@') else {
            return Err(AuthError::InvalidEmail);
        };

        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(AuthError::InvalidEmail);
        }

        if !domain.contains('.') || domain.split('.').any(|p| p.is_empty()) {
            return Err(AuthError::InvalidEmail);
        }

        Ok(())
    }

    /// Sign in with e-mail and password.
    ///
    /// The new token carries only the subject until the `jwt` hook fills it in.
    pub async fn sign_in(&self, request: SignInRequest) -> Result<AuthResponse, AuthError> {
        Self::validate_email(&request.email)?;

        let user_id = self
            .store
            .authorize(&request.email, &request.password)
            .await
            .map_err(AuthError::store)?
            .ok_or(AuthError::InvalidCredentials)?;

        self.issue(Token::for_subject(user_id)).await
    }

    /// Verify a token, refresh its claims, re-sign it and materialize the session
    pub async fn session(&self, raw_token: &str) -> Result<AuthResponse, AuthError> {
        let claims = self.jwt.verify(raw_token)?;
        self.issue(claims).await
    }

    /// Nothing is stored server-side under the token strategy; this only logs
    pub fn sign_out(&self, raw_token: Option<&str>) {
        let subject = raw_token
            .and_then(|t| self.jwt.verify(t).ok())
            .and_then(|claims| claims.sub);

        match subject {
            Some(sub) => tracing::info!("User signed out: {}", sub),
            None => tracing::debug!("Sign-out without a valid token"),
        }
    }

    async fn issue(&self, claims: Token) -> Result<AuthResponse, AuthError> {
        let token = self.callbacks.jwt(claims).await.map_err(AuthError::store)?;
        let signed = self.jwt.issue(token)?;

        let session = self
            .callbacks
            .session(Session::new(signed.expires_at), &signed.claims);

        Ok(AuthResponse {
            session,
            token: signed,
        })
    }
}
