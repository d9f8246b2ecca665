//! Token and session callbacks
//!
//! Two hooks run by the auth service:
//! - `jwt`: on token creation and every refresh, copies the current user
//!   fields onto the token ([`enrich_token`])
//! - `session`: before a session is handed out, copies the token's claims
//!   onto the session user ([`materialize_session`])

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::auth::jwt::Token;
use crate::core::auth::session::Session;
use crate::core::db::models::TokenUser;

/// Looks up the user projection carried on tokens.
///
/// `Ok(None)` means no such user. Errors are passed through the callbacks untouched.
#[async_trait]
pub trait UserLookup: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn find_for_token(&self, id: &str) -> Result<Option<TokenUser>, Self::Error>;
}

/// Refresh the application claims on `token` from the user store.
///
/// Returns the token unchanged when it has no subject (or an empty one) or the
/// subject has no user. Performs exactly one lookup when a subject is present.
pub async fn enrich_token<L>(lookup: &L, mut token: Token) -> Result<Token, L::Error>
where
    L: UserLookup + ?Sized,
{
    let Some(sub) = token.sub.clone().filter(|s| !s.is_empty()) else {
        return Ok(token);
    };

    match lookup.find_for_token(&sub).await? {
        Some(user) => token.apply_user(&user),
        None => tracing::debug!("No user for token subject {}, keeping claims", sub),
    }

    Ok(token)
}

/// Copy every claim present on `token` onto the session user.
///
/// Claims absent on the token leave the session's value as it was. The
/// session user id comes from the token subject. Sessions without a user
/// object are returned untouched.
pub fn materialize_session(mut session: Session, token: &Token) -> Session {
    if let Some(user) = session.user.as_mut() {
        copy_present(&mut user.id, &token.sub);
        copy_present(&mut user.email, &token.email);
        copy_present(&mut user.role, &token.role);
        copy_present(&mut user.image, &token.image);
        copy_present(&mut user.name, &token.name);
        copy_present(&mut user.sub_role, &token.sub_role);
        copy_present(&mut user.real_id, &token.real_id);
    }

    session
}

fn copy_present<T: Clone>(target: &mut Option<T>, source: &Option<T>) {
    if let Some(value) = source {
        *target = Some(value.clone());
    }
}

/// The callback pair bound to a user store.
///
/// Built once at startup and shared read-only.
pub struct AuthCallbacks<L> {
    lookup: Arc<L>,
    debug: bool,
}

impl<L> Clone for AuthCallbacks<L> {
    fn clone(&self) -> Self {
        Self {
            lookup: Arc::clone(&self.lookup),
            debug: self.debug,
        }
    }
}

impl<L: UserLookup> AuthCallbacks<L> {
    pub fn new(lookup: Arc<L>) -> Self {
        Self {
            lookup,
            debug: false,
        }
    }

    /// Log materialized sessions at debug level
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// `jwt` hook
    pub async fn jwt(&self, token: Token) -> Result<Token, L::Error> {
        enrich_token(self.lookup.as_ref(), token).await
    }

    /// `session` hook
    pub fn session(&self, session: Session, token: &Token) -> Session {
        let session = materialize_session(session, token);

        if self.debug {
            // Identifiers and role only; e-mail, name and image stay out of logs
            tracing::debug!(
                sub = ?token.sub,
                real_id = ?token.real_id,
                role = ?token.role,
                sub_role = ?token.sub_role,
                expires = %session.expires,
                has_user = session.user.is_some(),
                "Session materialized"
            );
        }

        session
    }
}
