//! Database module
//!
//! This module provides database connectivity, models, repositories and the
//! adapter the auth layer persists through, using PostgreSQL and SQLx.

pub mod adapter;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used items
pub use adapter::{AdapterError, ExpiredRows, PgAdapter};
pub use models::*;
pub use pool::{DbConfig, DbError, create_pool, create_pool_with_migrations, health_check};
pub use repositories::{
    AccountRepository, AccountRepositoryError, SessionRepository, SessionRepositoryError,
    UserRepository, UserRepositoryError, VerificationTokenRepository,
    VerificationTokenRepositoryError,
};

// Re-export sqlx types that might be needed
pub use sqlx::PgPool;
