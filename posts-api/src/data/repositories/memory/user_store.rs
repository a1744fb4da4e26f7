use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use crate::data::user_store::{NewUser, UserCredentials, UserStore};
use crate::domain::error::DomainError;
use crate::domain::user::User;

#[derive(Debug, Default)]
pub(crate) struct InMemoryUserStore {
    users: Mutex<HashMap<String, UserCredentials>>,
}

impl InMemoryUserStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert_user(&self, input: NewUser) -> Result<User, DomainError> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        if users.contains_key(&input.username) {
            return Err(DomainError::AlreadyExists("username".to_string()));
        }

        let id = i64::try_from(users.len()).unwrap_or(i64::MAX - 1) + 1;
        let user = User::new(id, input.username, Utc::now())?;
        users.insert(
            user.username.clone(),
            UserCredentials {
                user: user.clone(),
                password_hash: input.password_hash,
            },
        );
        Ok(user)
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, DomainError> {
        Ok(self
            .users
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(username)
            .cloned())
    }
}
