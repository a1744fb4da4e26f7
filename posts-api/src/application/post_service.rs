use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::application::paginator::Paginator;
use crate::data::post_store::{Direction, PostField, PostStore};
use crate::domain::error::DomainError;
use crate::domain::post::{Post, PostData, PostProjection, project};
use crate::domain::validation::PostValidator;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub(crate) struct PostPage {
    pub(crate) items: Vec<PostProjection>,
    pub(crate) total: i64,
    pub(crate) page: i64,
    pub(crate) limit: i64,
}

pub(crate) struct PostService {
    store: Arc<dyn PostStore>,
    validator: Arc<dyn PostValidator>,
    paginator: Arc<dyn Paginator>,
}

impl PostService {
    pub(crate) fn new(
        store: Arc<dyn PostStore>,
        validator: Arc<dyn PostValidator>,
        paginator: Arc<dyn Paginator>,
    ) -> Self {
        Self {
            store,
            validator,
            paginator,
        }
    }

    pub(crate) async fn create_post(&self, data: PostData) -> Result<Post, DomainError> {
        let mut post = Post::new(
            data.title.unwrap_or_default(),
            data.content.unwrap_or_default(),
            Utc::now(),
        );
        self.ensure_valid(&post)?;

        self.store.add(&mut post, true).await?;
        info!(post_id = ?post.id, "post created");
        Ok(post)
    }

    pub(crate) async fn update_post(&self, id: i64, data: PostData) -> Result<Post, DomainError> {
        let mut post = self.load(id).await?;
        post.apply(data);
        self.ensure_valid(&post)?;

        self.store.add(&mut post, true).await?;
        info!(post_id = id, "post updated");
        Ok(post)
    }

    pub(crate) async fn delete_post(&self, id: i64) -> Result<(), DomainError> {
        let post = self.load(id).await?;
        self.store.remove(&post, true).await?;
        info!(post_id = id, "post deleted");
        Ok(())
    }

    pub(crate) async fn get_post(&self, id: i64) -> Result<Post, DomainError> {
        self.load(id).await
    }

    /// Newest first; ties on the timestamp fall back to the id so pages
    /// never overlap.
    pub(crate) async fn get_all_posts(&self, page: i64, limit: i64) -> Result<PostPage, DomainError> {
        let query = self
            .store
            .create_query("p")
            .order_by(PostField::Timestamp, Direction::Desc)
            .add_order_by(PostField::Id, Direction::Desc);

        let slice = self.paginator.paginate(query, page, limit).await?;
        debug!(
            page = slice.page,
            limit = slice.limit,
            total = slice.total,
            "posts listed"
        );

        Ok(PostPage {
            items: slice.items.iter().map(project).collect(),
            total: slice.total,
            page: slice.page,
            limit: slice.limit,
        })
    }

    async fn load(&self, id: i64) -> Result<Post, DomainError> {
        self.store
            .find(id)
            .await?
            .ok_or_else(DomainError::post_not_found)
    }

    fn ensure_valid(&self, post: &Post) -> Result<(), DomainError> {
        let violations = self.validator.validate(post);
        if violations.is_empty() {
            return Ok(());
        }
        debug!(violations = violations.len(), "post rejected");
        Err(DomainError::Validation(violations))
    }
}
