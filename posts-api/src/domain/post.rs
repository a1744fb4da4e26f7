use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Wire format of [`Post::timestamp`] in every public projection.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A blog post as the store sees it.
///
/// `id` stays `None` until the store commits the post for the first time.
/// Field constraints are declared here but only checked by
/// [`crate::domain::validation::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub(crate) struct Post {
    pub(crate) id: Option<i64>,
    #[validate(
        custom(function = "not_blank", message = "Title should not be blank."),
        length(max = 255, message = "Title cannot be longer than 255 characters.")
    )]
    pub(crate) title: String,
    #[validate(custom(function = "not_blank", message = "Content should not be blank."))]
    pub(crate) content: String,
    pub(crate) timestamp: DateTime<Utc>,
}

impl Post {
    pub(crate) fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            title: title.into(),
            content: content.into(),
            timestamp,
        }
    }

    /// Rebuilds a post that already lives in the store.
    pub(crate) fn restore(
        id: i64,
        title: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(id),
            title: title.into(),
            content: content.into(),
            timestamp,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Partial merge: only the fields present in `data` are overwritten.
    pub(crate) fn apply(&mut self, data: PostData) {
        if let Some(title) = data.title {
            self.title = title;
        }
        if let Some(content) = data.content {
            self.content = content;
        }
    }
}

/// Caller supplied fields for create and update. Absent keys are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PostData {
    pub(crate) title: Option<String>,
    pub(crate) content: Option<String>,
}

impl PostData {
    #[cfg(test)]
    pub(crate) fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
        }
    }

    #[cfg(test)]
    pub(crate) fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    #[cfg(test)]
    pub(crate) fn content(content: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub(crate) struct PostProjection {
    pub(crate) id: Option<i64>,
    pub(crate) title: String,
    pub(crate) content: String,
    #[schema(example = "2024-05-01 12:30:00")]
    pub(crate) timestamp: String,
}

pub(crate) fn project(post: &Post) -> PostProjection {
    PostProjection {
        id: post.id,
        title: post.title.clone(),
        content: post.content.clone(),
        timestamp: post.timestamp.format(TIMESTAMP_FORMAT).to_string(),
    }
}

impl From<Post> for PostProjection {
    fn from(post: Post) -> Self {
        let timestamp = post.timestamp.format(TIMESTAMP_FORMAT).to_string();
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            timestamp,
        }
    }
}

/// Only the empty string is blank; whitespace is kept and accepted as is.
fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("not_blank"));
    }
    Ok(())
}
