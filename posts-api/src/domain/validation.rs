use serde::Serialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use super::post::Post;

/// One failed field constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Violation {
    pub(crate) property_path: String,
    pub(crate) message: String,
}

impl Violation {
    pub(crate) fn new(property_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            property_path: property_path.into(),
            message: message.into(),
        }
    }
}

pub(crate) trait PostValidator: Send + Sync {
    fn validate(&self, post: &Post) -> Vec<Violation>;
}

/// Checks the constraints declared on [`Post`].
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct ConstraintValidator;

impl PostValidator for ConstraintValidator {
    fn validate(&self, post: &Post) -> Vec<Violation> {
        validate(post)
    }
}

pub(crate) fn validate(post: &Post) -> Vec<Violation> {
    match Validate::validate(post) {
        Ok(()) => Vec::new(),
        Err(errors) => violations_from(&errors),
    }
}

/// Flattens field errors into violations sorted by property path.
pub(crate) fn violations_from(errors: &ValidationErrors) -> Vec<Violation> {
    let mut violations: Vec<Violation> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, field_errors)| {
            let field = field.to_string();
            field_errors
                .iter()
                .map(move |err| Violation::new(field.clone(), message_of(err)))
        })
        .collect();

    violations.sort_by(|a, b| a.property_path.cmp(&b.property_path));
    violations
}

fn message_of(err: &ValidationError) -> String {
    match &err.message {
        Some(message) => message.to_string(),
        None => format!("constraint '{}' failed", err.code),
    }
}
