use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::user::User;

/// A stored user together with its argon2 PHC hash. Never serialized.
#[derive(Debug, Clone)]
pub(crate) struct UserCredentials {
    pub(crate) user: User,
    pub(crate) password_hash: String,
}

#[derive(Debug, Clone)]
pub(crate) struct NewUser {
    pub(crate) username: String,
    pub(crate) password_hash: String,
}

#[async_trait]
pub(crate) trait UserStore: Send + Sync {
    /// Fails with [`DomainError::AlreadyExists`] when the username is taken.
    async fn insert_user(&self, input: NewUser) -> Result<User, DomainError>;

    /// Looks up by the already normalized username.
    async fn find_credentials(&self, username: &str)
    -> Result<Option<UserCredentials>, DomainError>;
}
