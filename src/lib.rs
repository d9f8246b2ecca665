//! admins-auth - Authentication backend for the mentors and admins dashboard
//!
//! Credentials sign-in with signed session tokens. Each token carries the
//! user's role, role-specific sub-role and profile id, refreshed from
//! PostgreSQL whenever the session is read.

pub mod core;
