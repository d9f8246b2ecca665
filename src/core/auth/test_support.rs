//! In-memory user store for callback, service and API tests

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::core::auth::callbacks::UserLookup;
use crate::core::auth::service::CredentialsAuthorizer;
use crate::core::db::models::{MentorType, Role, SubRole, TokenUser};

#[derive(Debug, thiserror::Error)]
#[error("user store unavailable")]
pub struct StoreUnavailable;

/// The user from the end-to-end example: a lead mentor named Ann
pub fn sample_user() -> TokenUser {
    TokenUser {
        id: "u1".to_string(),
        real_id: Some("r1".to_string()),
        email: "a@b.com".to_string(),
        role: Role::Mentor,
        sub_role: Some(SubRole::Mentor(MentorType::Lead)),
        image: Some("img.png".to_string()),
        name: Some("Ann".to_string()),
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, TokenUser>>,
    passwords: Mutex<HashMap<String, String>>,
    lookups: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: TokenUser) {
        self.users.lock().unwrap().insert(user.id.clone(), user);
    }

    pub fn insert_with_password(&self, user: TokenUser, password: &str) {
        self.passwords
            .lock()
            .unwrap()
            .insert(user.email.clone(), password.to_string());
        self.insert(user);
    }

    pub fn remove(&self, id: &str) {
        self.users.lock().unwrap().remove(id);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserLookup for MemoryUserStore {
    type Error = StoreUnavailable;

    async fn find_for_token(&self, id: &str) -> Result<Option<TokenUser>, Self::Error> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreUnavailable);
        }

        Ok(self.users.lock().unwrap().get(id).cloned())
    }
}

#[async_trait]
impl CredentialsAuthorizer for MemoryUserStore {
    type Error = StoreUnavailable;

    async fn authorize(&self, email: &str, password: &str) -> Result<Option<String>, Self::Error> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreUnavailable);
        }

        let matches = self
            .passwords
            .lock()
            .unwrap()
            .get(email)
            .is_some_and(|stored| stored == password);
        if !matches {
            return Ok(None);
        }

        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .map(|u| u.id.clone()))
    }
}
