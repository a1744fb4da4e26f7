use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::domain::error::DomainError;
use crate::domain::validation::{Violation, violations_from};

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("invalid JSON body: {0}")]
    Json(#[from] JsonRejection),

    #[error("invalid path: {0}")]
    Path(#[from] PathRejection),

    #[error("invalid query string: {0}")]
    Query(#[from] QueryRejection),

    #[error("no route for {0}")]
    UnknownRoute(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("request timed out")]
    Timeout,

    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Domain(DomainError::Validation(violations_from(&errors)))
    }
}

pub(crate) type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ErrorBody {
    pub(crate) message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub(crate) struct ViolationsBody {
    pub(crate) message: String,
    pub(crate) violations: Vec<Violation>,
}

const INTERNAL_MESSAGE: &str = "Internal server error.";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Domain(DomainError::Validation(violations)) => {
                let message = DomainError::Validation(violations.clone()).to_string();
                let body = ViolationsBody {
                    message,
                    violations,
                };
                return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
            }
            AppError::Domain(err) => match &err {
                DomainError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
                DomainError::AlreadyExists(_) => (StatusCode::CONFLICT, err.to_string()),
                DomainError::InvalidCredentials => (StatusCode::UNAUTHORIZED, err.to_string()),
                DomainError::Validation(_)
                | DomainError::Storage(_)
                | DomainError::Unexpected(_) => {
                    error!(error = %err, "request failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
                }
            },
            AppError::Json(rejection) => {
                (json_rejection_status(&rejection), rejection.body_text())
            }
            AppError::Path(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            AppError::Query(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            AppError::UnknownRoute(route) => {
                (StatusCode::NOT_FOUND, format!("No route found for {route}."))
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Full authentication is required to access this resource.".to_string(),
            ),
            AppError::Timeout => (StatusCode::REQUEST_TIMEOUT, "Request timed out.".to_string()),
            AppError::Internal(err) => {
                error!(error = %err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE.to_string())
            }
        };

        (status, Json(ErrorBody { message })).into_response()
    }
}

/// Well-formed JSON with the wrong field types is still a malformed body;
/// 422 stays reserved for constraint violations.
fn json_rejection_status(rejection: &JsonRejection) -> StatusCode {
    match rejection {
        JsonRejection::JsonDataError(_) => StatusCode::BAD_REQUEST,
        other => other.status(),
    }
}
