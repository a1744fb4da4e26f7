use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::application::auth_service::AuthService;
use crate::application::paginator::StorePaginator;
use crate::application::post_service::PostService;
use crate::data::post_store::PostStore;
use crate::data::user_store::UserStore;
use crate::domain::validation::ConstraintValidator;
use crate::infrastructure::jwt::JwtService;
use crate::infrastructure::settings::Settings;
use crate::presentation::middleware::cors::apply_cors;
use crate::presentation::middleware::limits::apply_limits;
use crate::presentation::middleware::trace::apply_trace;
use crate::presentation::openapi::ApiDoc;
use crate::presentation::{AppState, http_handlers};

/// Wires the services over whichever storage backend was selected.
pub(crate) fn build_state(
    settings: &Settings,
    post_store: Arc<dyn PostStore>,
    user_store: Arc<dyn UserStore>,
) -> Result<AppState> {
    let jwt = Arc::new(JwtService::new(&settings.jwt_secret, settings.jwt_ttl_seconds));

    let paginator = Arc::new(StorePaginator::new(Arc::clone(&post_store)));
    let post_service = Arc::new(PostService::new(
        post_store,
        Arc::new(ConstraintValidator),
        paginator,
    ));
    let auth_service = Arc::new(
        AuthService::new(user_store, Arc::clone(&jwt)).context("failed to init auth service")?,
    );

    Ok(AppState::new(post_service, auth_service, jwt))
}

pub(crate) async fn run_http(settings: &Settings, state: AppState) -> Result<()> {
    let app = build_app(settings, state)?;

    let listener = TcpListener::bind(&settings.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.http_addr))?;

    info!("HTTP server listening on {}", settings.http_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

pub(crate) fn build_app(settings: &Settings, state: AppState) -> Result<Router> {
    let app = build_router(state);
    let app = apply_limits(app, settings);
    let app = apply_trace(app);
    apply_cors(app, settings)
}

pub(crate) fn build_router(state: AppState) -> Router {
    http_handlers::routes(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::{build_app, build_state};
    use crate::data::repositories::memory::post_store::InMemoryPostStore;
    use crate::data::repositories::memory::user_store::InMemoryUserStore;
    use crate::infrastructure::settings::Settings;
    use crate::presentation::AppState;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    struct TestApp {
        app: Router,
        state: AppState,
    }

    impl TestApp {
        fn new() -> Self {
            let env: HashMap<&str, &str> = HashMap::from([
                ("STORAGE_BACKEND", "memory"),
                ("JWT_SECRET", SECRET),
                ("CORS_ORIGINS", "*"),
                ("HTTP_REQUEST_BODY_LIMIT_BYTES", "4096"),
            ]);
            let settings = Settings::from_lookup(|key| env.get(key).map(|v| v.to_string()))
                .expect("settings must load");

            let state = build_state(
                &settings,
                Arc::new(InMemoryPostStore::new()),
                Arc::new(InMemoryUserStore::new()),
            )
            .expect("state must build");
            let app = build_app(&settings, state.clone()).expect("app must build");

            Self { app, state }
        }

        fn token(&self) -> String {
            self.state
                .jwt
                .generate_token(1, "tester")
                .expect("token must encode")
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self
                .app
                .clone()
                .oneshot(request)
                .await
                .expect("router is infallible");
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX)
                .await
                .expect("body must be readable");
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, body)
        }

        async fn get(&self, uri: &str) -> (StatusCode, Value) {
            let request = Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request must build");
            self.send(request).await
        }

        async fn write(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let body = match body {
                Some(body) => {
                    builder = builder.header(header::CONTENT_TYPE, "application/json");
                    Body::from(body.to_string())
                }
                None => Body::empty(),
            };
            self.send(builder.body(body).expect("request must build"))
                .await
        }

        async fn create(&self, title: &str, content: &str) -> Value {
            let token = self.token();
            let (status, body) = self
                .write(
                    Method::POST,
                    "/api/posts",
                    Some(&token),
                    Some(json!({ "title": title, "content": content })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            body
        }
    }

    #[tokio::test]
    async fn healthz_reports_ok() {
        let app = TestApp::new();

        let (status, body) = app.get("/healthz").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn writes_without_token_are_rejected_without_side_effects() {
        let app = TestApp::new();
        let existing = app.create("Kept", "Body").await;
        let id = existing["id"].as_i64().expect("id must be set");
        let item = format!("/api/posts/{id}");
        let payload = json!({ "title": "Changed", "content": "Changed" });

        let (status, _) = app
            .write(Method::POST, "/api/posts", None, Some(payload.clone()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .write(Method::PUT, &item, Some("not-a-jwt"), Some(payload.clone()))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app.write(Method::PATCH, &item, None, Some(payload)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app.write(Method::DELETE, &item, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, page) = app.get("/api/posts").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["total"], json!(1));
        assert_eq!(page["items"][0], existing);
    }

    #[tokio::test]
    async fn post_lifecycle_over_http() {
        let app = TestApp::new();
        let token = app.token();

        let created = app.create("Hello", "World").await;
        let id = created["id"].as_i64().expect("id must be set");
        assert_eq!(created["title"], "Hello");
        assert_eq!(created["content"], "World");
        let timestamp = created["timestamp"].as_str().expect("timestamp is a string");
        assert_eq!(timestamp.len(), "2024-01-01 00:00:00".len());

        let item = format!("/api/posts/{id}");
        let (status, fetched) = app.get(&item).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (status, patched) = app
            .write(
                Method::PATCH,
                &item,
                Some(&token),
                Some(json!({ "title": "Renamed" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["title"], "Renamed");
        assert_eq!(patched["content"], "World");
        assert_eq!(patched["timestamp"], created["timestamp"]);

        let (status, replaced) = app
            .write(
                Method::PUT,
                &item,
                Some(&token),
                Some(json!({ "content": "Everyone" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(replaced["title"], "Renamed");
        assert_eq!(replaced["content"], "Everyone");

        let (status, body) = app.write(Method::DELETE, &item, Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, body) = app.get(&item).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "message": "Post not found." }));

        let (status, _) = app.write(Method::DELETE, &item, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_fields_yield_one_violation_each() {
        let app = TestApp::new();
        let token = app.token();

        let (status, body) = app
            .write(
                Method::POST,
                "/api/posts",
                Some(&token),
                Some(json!({ "title": "", "content": "" })),
            )
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body["violations"],
            json!([
                { "propertyPath": "content", "message": "Content should not be blank." },
                { "propertyPath": "title", "message": "Title should not be blank." }
            ])
        );

        let (_, page) = app.get("/api/posts").await;
        assert_eq!(page["total"], json!(0));
    }

    #[tokio::test]
    async fn update_rejects_blank_title_and_keeps_stored_post() {
        let app = TestApp::new();
        let token = app.token();
        let created = app.create("Title", "Content").await;
        let item = format!("/api/posts/{}", created["id"]);

        let (status, body) = app
            .write(Method::PATCH, &item, Some(&token), Some(json!({ "title": "" })))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["violations"].as_array().map(Vec::len), Some(1));

        let (_, fetched) = app.get(&item).await;
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn listing_pages_newest_first() {
        let app = TestApp::new();
        for n in 0..25 {
            app.create(&format!("Post {n}"), "Body").await;
        }

        let (status, first) = app.get("/api/posts").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["total"], json!(25));
        assert_eq!(first["page"], json!(1));
        assert_eq!(first["limit"], json!(10));
        assert_eq!(first["items"].as_array().map(Vec::len), Some(10));
        assert_eq!(first["items"][0]["title"], "Post 24");

        let (_, last) = app.get("/api/posts?page=3&limit=10").await;
        assert_eq!(last["items"].as_array().map(Vec::len), Some(5));
        assert_eq!(last["items"][4]["title"], "Post 0");

        let (_, clamped) = app.get("/api/posts?page=0&limit=1000").await;
        assert_eq!(clamped["page"], json!(1));
        assert_eq!(clamped["limit"], json!(100));
        assert_eq!(clamped["items"].as_array().map(Vec::len), Some(25));

        let (status, empty) = app.get("/api/posts?page=&limit=").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(empty["page"], json!(1));
        assert_eq!(empty["limit"], json!(10));

        let (_, beyond) = app.get("/api/posts?page=9").await;
        assert_eq!(beyond["items"], json!([]));
        assert_eq!(beyond["total"], json!(25));
    }

    #[tokio::test]
    async fn malformed_requests_are_bad_requests() {
        let app = TestApp::new();
        let token = app.token();

        let (status, body) = app.get("/api/posts/abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());

        let (status, _) = app.get("/api/posts?page=first").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .write(
                Method::POST,
                "/api/posts",
                Some(&token),
                Some(json!({ "title": 5, "content": "Body" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
        assert!(body.get("violations").is_none());

        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/posts")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"title\": "))
            .expect("request must build");
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let app = TestApp::new();
        let token = app.token();
        let content = "x".repeat(8 * 1024);

        let (status, _) = app
            .write(
                Method::POST,
                "/api/posts",
                Some(&token),
                Some(json!({ "title": "Big", "content": content })),
            )
            .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn unknown_route_renders_message() {
        let app = TestApp::new();

        let (status, body) = app.get("/api/comments").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "message": "No route found for /api/comments." }));
    }

    #[tokio::test]
    async fn register_then_login_issue_usable_tokens() {
        let app = TestApp::new();
        let credentials = json!({ "username": "alice", "password": "correct-horse" });

        let (status, registered) = app
            .write(Method::POST, "/api/register", None, Some(credentials.clone()))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(registered["user"]["username"], "alice");
        assert!(registered["token"].is_string());

        let (status, _) = app
            .write(Method::POST, "/api/register", None, Some(credentials.clone()))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = app
            .write(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "username": "alice", "password": "wrong-password" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, logged_in) = app
            .write(Method::POST, "/api/login", None, Some(credentials))
            .await;
        assert_eq!(status, StatusCode::OK);
        let token = logged_in["token"].as_str().expect("token is a string");

        let (status, _) = app
            .write(
                Method::POST,
                "/api/posts",
                Some(token),
                Some(json!({ "title": "Mine", "content": "Body" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn short_password_is_a_violation() {
        let app = TestApp::new();

        let (status, body) = app
            .write(
                Method::POST,
                "/api/register",
                None,
                Some(json!({ "username": "bob", "password": "short" })),
            )
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["violations"][0]["propertyPath"], "password");
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = TestApp::new();

        let (status, body) = app.get("/api-docs/openapi.json").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/posts/{id}"].is_object());
    }
}
