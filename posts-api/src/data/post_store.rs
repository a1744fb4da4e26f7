use async_trait::async_trait;

use super::error::StorageError;
use crate::domain::post::Post;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PostField {
    Id,
    Title,
    Content,
    Timestamp,
}

impl PostField {
    pub(crate) fn column(self) -> &'static str {
        match self {
            PostField::Id => "id",
            PostField::Title => "title",
            PostField::Content => "content",
            PostField::Timestamp => "timestamp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Asc,
    Desc,
}

impl Direction {
    pub(crate) fn keyword(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OrderBy {
    pub(crate) field: PostField,
    pub(crate) direction: Direction,
}

impl OrderBy {
    pub(crate) fn new(field: PostField, direction: Direction) -> Self {
        Self { field, direction }
    }
}

/// Exact-match filter; unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PostCriteria {
    pub(crate) id: Option<i64>,
    pub(crate) title: Option<String>,
    pub(crate) content: Option<String>,
}

impl PostCriteria {
    #[cfg(test)]
    pub(crate) fn by_title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub(crate) fn matches(&self, post: &Post) -> bool {
        self.id.is_none_or(|id| post.id == Some(id))
            && self.title.as_ref().is_none_or(|title| &post.title == title)
            && self
                .content
                .as_ref()
                .is_none_or(|content| &post.content == content)
    }
}

/// Description of a selection over the post collection.
///
/// Built by [`PostStore::create_query`], composed by callers, executed only
/// by the store that created it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PostQuery {
    alias: String,
    criteria: PostCriteria,
    ordering: Vec<OrderBy>,
}

impl PostQuery {
    pub(crate) fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            criteria: PostCriteria::default(),
            ordering: Vec::new(),
        }
    }

    /// Replaces any previous ordering.
    pub(crate) fn order_by(mut self, field: PostField, direction: Direction) -> Self {
        self.ordering = vec![OrderBy::new(field, direction)];
        self
    }

    pub(crate) fn add_order_by(mut self, field: PostField, direction: Direction) -> Self {
        self.ordering.push(OrderBy::new(field, direction));
        self
    }

    pub(crate) fn filter(mut self, criteria: PostCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub(crate) fn alias(&self) -> &str {
        &self.alias
    }

    pub(crate) fn criteria(&self) -> &PostCriteria {
        &self.criteria
    }

    pub(crate) fn ordering(&self) -> &[OrderBy] {
        &self.ordering
    }
}

/// A change registered without `commit`, applied by the next flush.
#[derive(Debug, Clone)]
pub(crate) enum PendingChange {
    /// A new post whose id was reserved when it was staged.
    Insert(Post),
    Update(Post),
    Remove(i64),
}

#[async_trait]
pub(crate) trait PostStore: Send + Sync {
    /// Inserts a new post or updates the title and content of a persisted
    /// one. A new post gets its id written back on commit; when only staged,
    /// the id is reserved right away and the row is written by the next
    /// flush, so the same entity is never inserted twice.
    async fn add(&self, post: &mut Post, commit: bool) -> Result<(), StorageError>;
    async fn remove(&self, post: &Post, commit: bool) -> Result<(), StorageError>;
    async fn flush(&self) -> Result<(), StorageError>;
    async fn find(&self, id: i64) -> Result<Option<Post>, StorageError>;

    fn create_query(&self, alias: &str) -> PostQuery {
        PostQuery::new(alias)
    }

    async fn count_matching(&self, query: &PostQuery) -> Result<i64, StorageError>;
    async fn fetch_matching(
        &self,
        query: &PostQuery,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Post>, StorageError>;

    /// Every post, ascending by id.
    async fn find_all(&self) -> Result<Vec<Post>, StorageError> {
        let query = self
            .create_query("p")
            .order_by(PostField::Id, Direction::Asc);
        self.fetch_matching(&query, None, None).await
    }

    async fn find_by_criteria(
        &self,
        criteria: &PostCriteria,
        order_by: &[OrderBy],
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Post>, StorageError> {
        let query = order_by.iter().fold(
            self.create_query("p").filter(criteria.clone()),
            |query, order| query.add_order_by(order.field, order.direction),
        );
        self.fetch_matching(&query, limit, offset).await
    }
}
