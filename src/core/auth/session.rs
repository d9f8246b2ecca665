//! Session view exposed to the application.
//!
//! A session is derived from a verified token on every request and never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::db::models::{Role, SubRole};

/// User fields visible on a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Option<String>,
    pub real_id: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub sub_role: Option<SubRole>,
    pub image: Option<String>,
    pub name: Option<String>,
}

/// Per-request session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// `None` when no user object is attached
    pub user: Option<SessionUser>,
    pub expires: DateTime<Utc>,
}

impl Session {
    /// Session with an empty user object
    pub fn new(expires: DateTime<Utc>) -> Self {
        Self {
            user: Some(SessionUser::default()),
            expires,
        }
    }

    /// Session without a user object
    pub fn anonymous(expires: DateTime<Utc>) -> Self {
        Self {
            user: None,
            expires,
        }
    }
}
