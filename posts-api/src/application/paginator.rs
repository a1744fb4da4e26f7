use std::sync::Arc;

use async_trait::async_trait;

use crate::data::error::StorageError;
use crate::data::post_store::{PostQuery, PostStore};
use crate::domain::post::Post;

pub(crate) const DEFAULT_PAGE: i64 = 1;
pub(crate) const DEFAULT_LIMIT: i64 = 10;
pub(crate) const MAX_LIMIT: i64 = 100;

/// One window of a paginated query, with the page and limit actually used.
#[derive(Debug, Clone)]
pub(crate) struct PageSlice {
    pub(crate) items: Vec<Post>,
    pub(crate) total: i64,
    pub(crate) page: i64,
    pub(crate) limit: i64,
}

#[async_trait]
pub(crate) trait Paginator: Send + Sync {
    async fn paginate(
        &self,
        query: PostQuery,
        page: i64,
        limit: i64,
    ) -> Result<PageSlice, StorageError>;
}

/// Runs queries against the store that created them.
pub(crate) struct StorePaginator {
    store: Arc<dyn PostStore>,
}

impl StorePaginator {
    pub(crate) fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Paginator for StorePaginator {
    async fn paginate(
        &self,
        query: PostQuery,
        page: i64,
        limit: i64,
    ) -> Result<PageSlice, StorageError> {
        let (page, limit) = clamp(page, limit);
        let offset = (page - 1).saturating_mul(limit);

        let total = self.store.count_matching(&query).await?;
        let items = if offset < total {
            self.store
                .fetch_matching(&query, Some(limit), Some(offset))
                .await?
        } else {
            Vec::new()
        };

        Ok(PageSlice {
            items,
            total,
            page,
            limit,
        })
    }
}

pub(crate) fn clamp(page: i64, limit: i64) -> (i64, i64) {
    let page = if page < 1 { DEFAULT_PAGE } else { page };
    let limit = match limit {
        limit if limit < 1 => DEFAULT_LIMIT,
        limit => limit.min(MAX_LIMIT),
    };
    (page, limit)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};

    use super::{DEFAULT_LIMIT, MAX_LIMIT, Paginator, StorePaginator, clamp};
    use crate::data::post_store::{Direction, PostField, PostStore};
    use crate::data::repositories::memory::post_store::InMemoryPostStore;
    use crate::domain::post::Post;

    #[test]
    fn clamp_replaces_non_positive_values_with_defaults() {
        assert_eq!(clamp(0, 0), (1, DEFAULT_LIMIT));
        assert_eq!(clamp(-3, -1), (1, DEFAULT_LIMIT));
        assert_eq!(clamp(4, 25), (4, 25));
        assert_eq!(clamp(1, 1_000), (1, MAX_LIMIT));
    }

    async fn seeded_store(count: i64) -> Arc<dyn PostStore> {
        let store: Arc<dyn PostStore> = Arc::new(InMemoryPostStore::new());
        let base = Utc::now();
        for n in 0..count {
            let mut post = Post::new(format!("post {n}"), "body", base + Duration::seconds(n));
            store.add(&mut post, true).await.expect("seed must succeed");
        }
        store
    }

    #[tokio::test]
    async fn paginate_returns_window_and_total() {
        let store = seeded_store(25).await;
        let paginator = StorePaginator::new(store.clone());
        let query = store
            .create_query("p")
            .order_by(PostField::Timestamp, Direction::Desc);

        let page = paginator
            .paginate(query, 2, 10)
            .await
            .expect("paginate must succeed");

        assert_eq!(page.total, 25);
        assert_eq!(page.page, 2);
        assert_eq!(page.limit, 10);
        assert_eq!(page.items.len(), 10);
        assert_eq!(page.items[0].title, "post 14");
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty_but_keeps_total() {
        let store = seeded_store(3).await;
        let paginator = StorePaginator::new(store.clone());

        let page = paginator
            .paginate(store.create_query("p"), 9, 10)
            .await
            .expect("paginate must succeed");

        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
        assert_eq!(page.page, 9);
    }

    #[tokio::test]
    async fn paginate_echoes_clamped_values() {
        let store = seeded_store(12).await;
        let paginator = StorePaginator::new(store.clone());

        let page = paginator
            .paginate(store.create_query("p"), 0, 0)
            .await
            .expect("paginate must succeed");

        assert_eq!(page.page, 1);
        assert_eq!(page.limit, DEFAULT_LIMIT);
        assert_eq!(page.items.len(), 10);
    }
}
