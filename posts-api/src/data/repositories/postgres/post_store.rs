use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use crate::data::error::StorageError;
use crate::data::post_store::{PendingChange, PostQuery, PostStore};
use crate::domain::post::Post;

const DEFAULT_ALIAS: &str = "p";

#[derive(Debug)]
pub(crate) struct PostgresPostStore {
    pool: PgPool,
    pending: Mutex<Vec<PendingChange>>,
}

impl PostgresPostStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self {
            pool,
            pending: Mutex::new(Vec::new()),
        }
    }

    fn stage(&self, change: PendingChange) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(change);
    }

    fn take_pending(&self) -> Vec<PendingChange> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Runs the staged changes plus `current` in one transaction.
    async fn commit(&self, current: Option<Current<'_>>) -> Result<(), StorageError> {
        let pending = self.take_pending();
        let mut tx = self.pool.begin().await?;

        for change in pending {
            match change {
                PendingChange::Insert(post) => insert_reserved(&mut tx, &post).await?,
                PendingChange::Update(mut post) => save_post(&mut tx, &mut post).await?,
                PendingChange::Remove(id) => delete_post(&mut tx, id).await?,
            }
        }

        match current {
            Some(Current::Save(post)) => save_post(&mut tx, post).await?,
            Some(Current::Remove(id)) => delete_post(&mut tx, id).await?,
            None => {}
        }

        tx.commit().await?;
        Ok(())
    }

    async fn reserve_id(&self) -> Result<i64, StorageError> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT nextval(pg_get_serial_sequence('posts', 'id'))",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }
}

enum Current<'a> {
    Save(&'a mut Post),
    Remove(i64),
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    content: String,
    timestamp: DateTime<Utc>,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post::restore(row.id, row.title, row.content, row.timestamp)
    }
}

#[async_trait]
impl PostStore for PostgresPostStore {
    async fn add(&self, post: &mut Post, commit: bool) -> Result<(), StorageError> {
        if commit {
            return self.commit(Some(Current::Save(post))).await;
        }

        if post.id.is_none() {
            post.id = Some(self.reserve_id().await?);
            self.stage(PendingChange::Insert(post.clone()));
        } else {
            self.stage(PendingChange::Update(post.clone()));
        }
        Ok(())
    }

    async fn remove(&self, post: &Post, commit: bool) -> Result<(), StorageError> {
        let id = post.id.ok_or(StorageError::Detached)?;
        if !commit {
            self.stage(PendingChange::Remove(id));
            return Ok(());
        }
        self.commit(Some(Current::Remove(id))).await
    }

    async fn flush(&self) -> Result<(), StorageError> {
        self.commit(None).await
    }

    async fn find(&self, id: i64) -> Result<Option<Post>, StorageError> {
        let row = sqlx::query_as::<_, PostRow>(
            r#"
            SELECT id, title, content, "timestamp"
            FROM posts
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Post::from))
    }

    async fn count_matching(&self, query: &PostQuery) -> Result<i64, StorageError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*)");
        push_from_where(&mut builder, query);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn fetch_matching(
        &self,
        query: &PostQuery,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Post>, StorageError> {
        let alias = sql_alias(query);
        let mut builder = QueryBuilder::<Postgres>::new("SELECT ");
        builder
            .push(alias)
            .push(".id, ")
            .push(alias)
            .push(".title, ")
            .push(alias)
            .push(".content, ")
            .push(alias)
            .push(r#"."timestamp""#);
        push_from_where(&mut builder, query);

        let mut separator = " ORDER BY ";
        for order in query.ordering() {
            builder
                .push(separator)
                .push(alias)
                .push(".")
                .push(quoted(order.field.column()))
                .push(" ")
                .push(order.direction.keyword());
            separator = ", ";
        }

        if let Some(limit) = limit {
            builder.push(" LIMIT ").push_bind(limit.max(0));
        }
        if let Some(offset) = offset {
            builder.push(" OFFSET ").push_bind(offset.max(0));
        }

        let rows = builder
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Post::from).collect())
    }
}

async fn save_post(conn: &mut PgConnection, post: &mut Post) -> Result<(), StorageError> {
    match post.id {
        None => {
            let id = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO posts (title, content, "timestamp")
                VALUES ($1, $2, $3)
                RETURNING id
                "#,
            )
            .bind(&post.title)
            .bind(&post.content)
            .bind(post.timestamp)
            .fetch_one(&mut *conn)
            .await?;
            post.id = Some(id);
        }
        Some(id) => {
            sqlx::query(
                r#"
                UPDATE posts
                SET title = $2,
                    content = $3
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(&post.title)
            .bind(&post.content)
            .execute(&mut *conn)
            .await?;
        }
    }
    Ok(())
}

async fn insert_reserved(conn: &mut PgConnection, post: &Post) -> Result<(), StorageError> {
    let id = post.id.ok_or(StorageError::Detached)?;
    sqlx::query(
        r#"
        INSERT INTO posts (id, title, content, "timestamp")
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(&post.title)
    .bind(&post.content)
    .bind(post.timestamp)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn delete_post(conn: &mut PgConnection, id: i64) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        DELETE FROM posts
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn push_from_where(builder: &mut QueryBuilder<'_, Postgres>, query: &PostQuery) {
    let alias = sql_alias(query);
    builder.push(" FROM posts ").push(alias);

    let criteria = query.criteria();
    let mut keyword = " WHERE ";
    if let Some(id) = criteria.id {
        builder.push(keyword).push(alias).push(".id = ").push_bind(id);
        keyword = " AND ";
    }
    if let Some(title) = &criteria.title {
        builder
            .push(keyword)
            .push(alias)
            .push(".title = ")
            .push_bind(title.clone());
        keyword = " AND ";
    }
    if let Some(content) = &criteria.content {
        builder
            .push(keyword)
            .push(alias)
            .push(".content = ")
            .push_bind(content.clone());
    }
}

/// Aliases are spliced into SQL, so anything but a plain identifier falls
/// back to the default.
fn sql_alias(query: &PostQuery) -> &str {
    let alias = query.alias();
    let is_identifier = alias
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && alias
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_');

    if is_identifier { alias } else { DEFAULT_ALIAS }
}

fn quoted(column: &str) -> String {
    format!("\"{column}\"")
}
