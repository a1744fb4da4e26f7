use axum::Router;
use axum::middleware;
use axum::routing::{get, post, put};

use crate::presentation::AppState;
use crate::presentation::handlers::posts::{
    create_post, delete_post, get_post, list_posts, update_post,
};
use crate::presentation::middleware::auth::jwt_auth_middleware;

pub(crate) fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/api/posts", get(list_posts))
        .route("/api/posts/{id}", get(get_post));

    let protected = Router::new()
        .route("/api/posts", post(create_post))
        .route(
            "/api/posts/{id}",
            put(update_post).patch(update_post).delete(delete_post),
        )
        .route_layer(middleware::from_fn_with_state(state, jwt_auth_middleware));

    public.merge(protected)
}
