//! Database repositories for admins-auth
//!
//! Repositories encapsulate data access for users, linked accounts,
//! server-side sessions and verification tokens.

pub mod account;
pub mod session;
pub mod user;
pub mod verification_token;

pub use account::{AccountRepository, AccountRepositoryError};
pub use session::{SessionRepository, SessionRepositoryError};
pub use user::{UserRepository, UserRepositoryError};
pub use verification_token::{VerificationTokenRepository, VerificationTokenRepositoryError};
