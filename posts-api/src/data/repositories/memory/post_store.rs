use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::data::error::StorageError;
use crate::data::post_store::{
    Direction, OrderBy, PendingChange, PostField, PostQuery, PostStore,
};
use crate::domain::post::Post;

#[derive(Debug, Default)]
pub(crate) struct InMemoryPostStore {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    last_id: i64,
    posts: BTreeMap<i64, Post>,
    pending: Vec<PendingChange>,
}

impl State {
    fn save(&mut self, post: &mut Post) {
        match post.id {
            None => {
                let id = self.reserve_id();
                post.id = Some(id);
                self.posts.insert(id, post.clone());
            }
            Some(id) => {
                // a post removed in the meantime stays removed
                if let Some(stored) = self.posts.get_mut(&id) {
                    stored.title.clone_from(&post.title);
                    stored.content.clone_from(&post.content);
                }
            }
        }
    }

    fn reserve_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn flush(&mut self) {
        for change in std::mem::take(&mut self.pending) {
            match change {
                PendingChange::Insert(post) => {
                    if let Some(id) = post.id {
                        self.posts.insert(id, post);
                    }
                }
                PendingChange::Update(mut post) => self.save(&mut post),
                PendingChange::Remove(id) => {
                    self.posts.remove(&id);
                }
            }
        }
    }

    fn select(&self, query: &PostQuery) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .values()
            .filter(|post| query.criteria().matches(post))
            .cloned()
            .collect();
        posts.sort_by(|a, b| compare(query.ordering(), a, b));
        posts
    }
}

impl InMemoryPostStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PostStore for InMemoryPostStore {
    async fn add(&self, post: &mut Post, commit: bool) -> Result<(), StorageError> {
        let mut state = self.state();
        if commit {
            state.flush();
            state.save(post);
        } else if post.id.is_none() {
            post.id = Some(state.reserve_id());
            state.pending.push(PendingChange::Insert(post.clone()));
        } else {
            state.pending.push(PendingChange::Update(post.clone()));
        }
        Ok(())
    }

    async fn remove(&self, post: &Post, commit: bool) -> Result<(), StorageError> {
        let id = post.id.ok_or(StorageError::Detached)?;
        let mut state = self.state();
        state.pending.push(PendingChange::Remove(id));
        if commit {
            state.flush();
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), StorageError> {
        self.state().flush();
        Ok(())
    }

    async fn find(&self, id: i64) -> Result<Option<Post>, StorageError> {
        Ok(self.state().posts.get(&id).cloned())
    }

    async fn count_matching(&self, query: &PostQuery) -> Result<i64, StorageError> {
        let state = self.state();
        let count = state
            .posts
            .values()
            .filter(|post| query.criteria().matches(post))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn fetch_matching(
        &self,
        query: &PostQuery,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Post>, StorageError> {
        let offset = usize::try_from(offset.unwrap_or(0).max(0)).unwrap_or(usize::MAX);
        let limit = match limit {
            Some(limit) => usize::try_from(limit.max(0)).unwrap_or(usize::MAX),
            None => usize::MAX,
        };

        Ok(self
            .state()
            .select(query)
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }
}

fn compare(ordering: &[OrderBy], a: &Post, b: &Post) -> Ordering {
    ordering
        .iter()
        .map(|order| {
            let ord = match order.field {
                PostField::Id => a.id.cmp(&b.id),
                PostField::Title => a.title.cmp(&b.title),
                PostField::Content => a.content.cmp(&b.content),
                PostField::Timestamp => a.timestamp.cmp(&b.timestamp),
            };
            match order.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        })
        .find(|ord| ord.is_ne())
        .unwrap_or(Ordering::Equal)
}
