use thiserror::Error;

use super::validation::Violation;
use crate::data::error::StorageError;

#[derive(Debug, Error)]
pub(crate) enum DomainError {
    #[error("validation failed: {}", describe_violations(.0))]
    Validation(Vec<Violation>),

    #[error("{0}")]
    NotFound(String),

    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("unexpected domain error: {0}")]
    Unexpected(String),
}

impl DomainError {
    pub(crate) fn post_not_found() -> Self {
        DomainError::NotFound("Post not found.".to_string())
    }

    pub(crate) fn invalid_field(property_path: &'static str, message: impl Into<String>) -> Self {
        DomainError::Validation(vec![Violation::new(property_path, message)])
    }
}

fn describe_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|violation| format!("{}: {}", violation.property_path, violation.message))
        .collect::<Vec<_>>()
        .join("; ")
}
