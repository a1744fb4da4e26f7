use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Deserializer, de};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::application::paginator::{DEFAULT_LIMIT, DEFAULT_PAGE};
use crate::application::post_service::PostPage;
use crate::domain::post::{PostData, PostProjection};
use crate::presentation::AppState;
use crate::presentation::app_error::{AppResult, ErrorBody, ViolationsBody};
use crate::presentation::extract::{AppJson, AppPath, AppQuery};
use crate::presentation::middleware::auth::AuthenticatedUser;

/// Body of create and update requests. Missing keys leave the field untouched
/// on update and count as blank on create.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub(crate) struct PostInputDto {
    pub(crate) title: Option<String>,
    pub(crate) content: Option<String>,
}

impl From<PostInputDto> for PostData {
    fn from(dto: PostInputDto) -> Self {
        Self {
            title: dto.title,
            content: dto.content,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct PageQuery {
    /// 1-based page number, values below 1 read as 1.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub(crate) page: Option<i64>,
    /// Page size, clamped to 1..=100 with 10 as the fallback.
    #[serde(default, deserialize_with = "empty_as_none")]
    pub(crate) limit: Option<i64>,
}

/// `?limit=` with no value means "use the default", not a parse error.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(de::Error::custom),
    }
}

#[utoipa::path(
    get,
    path = "/api/posts",
    tag = "posts",
    params(PageQuery),
    responses(
        (status = 200, description = "Posts listed, newest first", body = PostPage),
        (status = 400, description = "Malformed query string", body = ErrorBody),
        (status = 500, description = "Internal error", body = ErrorBody)
    )
)]
pub(crate) async fn list_posts(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PageQuery>,
) -> AppResult<Json<PostPage>> {
    let page = state
        .post_service
        .get_all_posts(
            query.page.unwrap_or(DEFAULT_PAGE),
            query.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .await?;

    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    tag = "posts",
    params(
        ("id" = i64, Path, description = "Post id")
    ),
    responses(
        (status = 200, description = "Post found", body = PostProjection),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "Post not found", body = ErrorBody)
    )
)]
pub(crate) async fn get_post(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> AppResult<Json<PostProjection>> {
    let post = state.post_service.get_post(id).await?;
    Ok(Json(post.into()))
}

#[utoipa::path(
    post,
    path = "/api/posts",
    tag = "posts",
    request_body = PostInputDto,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Post created", body = PostProjection),
        (status = 400, description = "Malformed body", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 422, description = "Constraint violations", body = ViolationsBody)
    )
)]
pub(crate) async fn create_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    AppJson(dto): AppJson<PostInputDto>,
) -> AppResult<(StatusCode, Json<PostProjection>)> {
    let post = state.post_service.create_post(dto.into()).await?;
    debug!(
        user_id = user.user_id,
        username = %user.username,
        post_id = ?post.id,
        "create requested"
    );

    Ok((StatusCode::CREATED, Json(post.into())))
}

#[utoipa::path(
    put,
    path = "/api/posts/{id}",
    tag = "posts",
    params(
        ("id" = i64, Path, description = "Post id")
    ),
    request_body = PostInputDto,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Post updated", body = PostProjection),
        (status = 400, description = "Malformed id or body", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "Post not found", body = ErrorBody),
        (status = 422, description = "Constraint violations", body = ViolationsBody)
    )
)]
pub(crate) async fn update_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    AppPath(id): AppPath<i64>,
    AppJson(dto): AppJson<PostInputDto>,
) -> AppResult<Json<PostProjection>> {
    let post = state.post_service.update_post(id, dto.into()).await?;
    debug!(user_id = user.user_id, post_id = id, "update requested");

    Ok(Json(post.into()))
}

#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    tag = "posts",
    params(
        ("id" = i64, Path, description = "Post id")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 204, description = "Post deleted"),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 401, description = "Missing or invalid token", body = ErrorBody),
        (status = 404, description = "Post not found", body = ErrorBody)
    )
)]
pub(crate) async fn delete_post(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    AppPath(id): AppPath<i64>,
) -> AppResult<StatusCode> {
    state.post_service.delete_post(id).await?;
    debug!(user_id = user.user_id, post_id = id, "delete requested");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::extract::Query;
    use axum::http::Uri;

    use super::PageQuery;

    fn parse(uri: &'static str) -> Option<PageQuery> {
        Query::<PageQuery>::try_from_uri(&Uri::from_static(uri))
            .ok()
            .map(|Query(query)| query)
    }

    #[test]
    fn empty_and_missing_values_fall_back_to_defaults() {
        let query = parse("/api/posts?page=&limit=").expect("empty values must parse");
        assert_eq!((query.page, query.limit), (None, None));

        let query = parse("/api/posts").expect("missing values must parse");
        assert_eq!((query.page, query.limit), (None, None));
    }

    #[test]
    fn numbers_parse_and_garbage_is_rejected() {
        let query = parse("/api/posts?page=3&limit=25").expect("numbers must parse");
        assert_eq!((query.page, query.limit), (Some(3), Some(25)));

        assert!(parse("/api/posts?limit=ten").is_none());
    }
}
