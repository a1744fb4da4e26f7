use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::data::error::StorageError;
use crate::data::user_store::{NewUser, UserCredentials, UserStore};
use crate::domain::error::DomainError;
use crate::domain::user::User;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Clone)]
pub(crate) struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    id: i64,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<CredentialsRow> for UserCredentials {
    type Error = DomainError;

    fn try_from(row: CredentialsRow) -> Result<Self, Self::Error> {
        let user = User::new(row.id, row.username, row.created_at).map_err(|err| {
            DomainError::from(StorageError::InvalidRow(format!("users.id={}: {err}", row.id)))
        })?;

        Ok(Self {
            user,
            password_hash: row.password_hash,
        })
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn insert_user(&self, input: NewUser) -> Result<User, DomainError> {
        let row = sqlx::query_as::<_, CredentialsRow>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(&input.username)
        .bind(&input.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(insert_error)?;

        UserCredentials::try_from(row).map(|credentials| credentials.user)
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, DomainError> {
        sqlx::query_as::<_, CredentialsRow>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?
        .map(UserCredentials::try_from)
        .transpose()
    }
}

fn insert_error(err: sqlx::Error) -> DomainError {
    let taken = err
        .as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code == UNIQUE_VIOLATION);

    if taken {
        DomainError::AlreadyExists("username".to_string())
    } else {
        StorageError::Database(err).into()
    }
}

#[cfg(test)]
mod tests {
    use sqlx::PgPool;

    use super::PostgresUserStore;
    use crate::data::user_store::{NewUser, UserStore};
    use crate::domain::error::DomainError;

    #[tokio::test]
    #[ignore = "requires running PostgreSQL (DATABASE_URL)"]
    async fn duplicate_username_is_already_exists() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = PgPool::connect(&url).await.expect("database must be reachable");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("migrations must apply");
        let store = PostgresUserStore::new(pool);
        let username = format!("pg-user-{}", chrono::Utc::now().timestamp_micros());
        let input = NewUser {
            username: username.clone(),
            password_hash: "$argon2id$stub".to_string(),
        };

        let user = store
            .insert_user(input.clone())
            .await
            .expect("first insert must succeed");
        assert_eq!(user.username, username);

        let err = store
            .insert_user(input)
            .await
            .expect_err("second insert must conflict");
        assert!(matches!(err, DomainError::AlreadyExists(_)));

        let found = store
            .find_credentials(&username)
            .await
            .expect("lookup must succeed")
            .expect("user must exist");
        assert_eq!(found.user.id, user.id);
    }
}
