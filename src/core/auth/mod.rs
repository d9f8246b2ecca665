//! Authentication module
//!
//! This module provides authentication functionality including:
//! - Signed session tokens (HS256 JWT)
//! - The `jwt` and `session` callbacks that carry role data onto tokens and sessions
//! - Credentials sign-in and sliding session refresh
//! - REST API endpoints for auth operations

pub mod api;
pub mod callbacks;
pub mod jwt;
pub mod service;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use api::{AuthApiState, SESSION_COOKIE, auth_api_router};
pub use callbacks::{AuthCallbacks, UserLookup, enrich_token, materialize_session};
pub use jwt::{JwtConfig, JwtError, JwtService, SignedToken, Token};
pub use service::{AuthError, AuthResponse, AuthService, CredentialsAuthorizer, SignInRequest};
pub use session::{Session, SessionUser};
