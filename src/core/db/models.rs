//! Database models for admins-auth
//!
//! This module defines the database entity structs that map to PostgreSQL tables,
//! the role enumerations, and the user projection carried on session tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ============================================================================
// Roles
// ============================================================================

/// Top-level classification of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "VARCHAR", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Mentor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::Mentor => "MENTOR",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ADMIN" => Ok(Role::Admin),
            "MENTOR" => Ok(Role::Mentor),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Qualifier for users with the `MENTOR` role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MentorType {
    Lead,
    Senior,
    Junior,
}

impl MentorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MentorType::Lead => "LEAD",
            MentorType::Senior => "SENIOR",
            MentorType::Junior => "JUNIOR",
        }
    }
}

impl std::str::FromStr for MentorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "LEAD" => Ok(MentorType::Lead),
            "SENIOR" => Ok(MentorType::Senior),
            "JUNIOR" => Ok(MentorType::Junior),
            _ => Err(format!("Invalid mentor type: {}", s)),
        }
    }
}

/// Qualifier for users with the `ADMIN` role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdminType {
    SuperAdmin,
    Staff,
}

impl AdminType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdminType::SuperAdmin => "SUPER_ADMIN",
            AdminType::Staff => "STAFF",
        }
    }
}

impl std::str::FromStr for AdminType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SUPER_ADMIN" => Ok(AdminType::SuperAdmin),
            "STAFF" => Ok(AdminType::Staff),
            _ => Err(format!("Invalid admin type: {}", s)),
        }
    }
}

/// Sub-role of a user. Which enumeration applies depends on the user's [`Role`].
///
/// Serialized as the bare variant string (`"LEAD"`, `"STAFF"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SubRole {
    Mentor(MentorType),
    Admin(AdminType),
}

impl SubRole {
    /// Parse a stored sub-role against the enumeration that matches `role`.
    ///
    /// Returns `None` when the value belongs to the other enumeration or is unknown.
    pub fn parse(role: Role, raw: &str) -> Option<Self> {
        match role {
            Role::Mentor => raw.parse().ok().map(SubRole::Mentor),
            Role::Admin => raw.parse().ok().map(SubRole::Admin),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubRole::Mentor(t) => t.as_str(),
            SubRole::Admin(t) => t.as_str(),
        }
    }

    /// The role this sub-role qualifies
    pub fn role(&self) -> Role {
        match self {
            SubRole::Mentor(_) => Role::Mentor,
            SubRole::Admin(_) => Role::Admin,
        }
    }
}

impl std::fmt::Display for SubRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<MentorType> for SubRole {
    fn from(t: MentorType) -> Self {
        SubRole::Mentor(t)
    }
}

impl From<AdminType> for SubRole {
    fn from(t: AdminType) -> Self {
        SubRole::Admin(t)
    }
}

// ============================================================================
// User Model
// ============================================================================

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub email_verified: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User data for creation (id and timestamps are generated)
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub email_verified: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Role,
}

/// User data for updates
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub email_verified: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub image: Option<String>,
    pub role: Option<Role>,
}

/// The user fields copied onto a session token.
///
/// `real_id` is the id of the mentor or admin profile linked to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUser {
    pub id: String,
    pub real_id: Option<String>,
    pub email: String,
    pub role: Role,
    pub sub_role: Option<SubRole>,
    pub image: Option<String>,
    pub name: Option<String>,
}

/// Raw row behind [`TokenUser`]; the sub-role is still a string here
#[derive(Debug, Clone, FromRow)]
pub struct TokenUserRow {
    pub id: String,
    pub real_id: Option<String>,
    pub email: String,
    pub role: Role,
    pub sub_role: Option<String>,
    pub image: Option<String>,
    pub name: Option<String>,
}

impl From<TokenUserRow> for TokenUser {
    fn from(row: TokenUserRow) -> Self {
        let sub_role = row.sub_role.as_deref().and_then(|raw| {
            let parsed = SubRole::parse(row.role, raw);
            if parsed.is_none() {
                tracing::warn!(
                    "Ignoring sub-role {:?} for user {} with role {}",
                    raw,
                    row.id,
                    row.role
                );
            }
            parsed
        });

        Self {
            id: row.id,
            real_id: row.real_id,
            email: row.email,
            role: row.role,
            sub_role,
            image: row.image,
            name: row.name,
        }
    }
}

// ============================================================================
// Account Model
// ============================================================================

/// Provider account linked to a user
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing)]
    pub access_token: Option<String>,
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    #[serde(skip_serializing)]
    pub id_token: Option<String>,
    pub session_state: Option<String>,
}

/// Account data for linking
#[derive(Debug, Clone, Deserialize)]
pub struct LinkAccount {
    pub user_id: String,
    #[serde(rename = "type")]
    pub account_type: String,
    pub provider: String,
    pub provider_account_id: String,
    pub refresh_token: Option<String>,
    pub access_token: Option<String>,
    pub expires_at: Option<i64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub id_token: Option<String>,
    pub session_state: Option<String>,
}

// ============================================================================
// Session Model
// ============================================================================

/// Server-side session record
#[derive(Debug, Clone, FromRow)]
pub struct SessionRecord {
    pub id: String,
    /// SHA-256 hex digest of the session token handed to the client
    pub session_token: String,
    pub user_id: String,
    pub expires: DateTime<Utc>,
}

// ============================================================================
// Verification Token Model
// ============================================================================

/// One-time verification token
#[derive(Debug, Clone, FromRow)]
pub struct VerificationToken {
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
}

impl VerificationToken {
    pub fn is_expired(&self) -> bool {
        self.expires <= Utc::now()
    }
}

// ============================================================================
// Tests
// ============================================================================
