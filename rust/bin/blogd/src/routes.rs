//! Route registration: module routes plus system endpoints.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;

use crate::auth_middleware::{self, JwtState};

/// Build the complete router.
///
/// Each module is nested under `/{name}`. The JWT middleware wraps
/// everything; it never rejects anonymous requests, so the system endpoints
/// stay public.
pub fn build_router(jwt_state: Arc<JwtState>, module_routes: Vec<(&str, Router)>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/version", get(version));

    for (name, router) in module_routes {
        app = app.nest(&format!("/{}", name), router);
    }

    app.layer(middleware::from_fn_with_state(
        jwt_state,
        auth_middleware::auth_middleware,
    ))
}

async fn health() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "status": "ok",
    }))
}

async fn version() -> impl IntoResponse {
    axum::Json(serde_json::json!({
        "name": "blogd",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use blog::BlogModule;
    use blog_core::Module;
    use blog_sql::SqliteStore;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::auth_middleware::tests::{SECRET, token};

    fn app() -> Router {
        let sql = Arc::new(SqliteStore::open_in_memory().unwrap());
        let blog = BlogModule::new(sql).unwrap();
        build_router(
            Arc::new(JwtState::from_secret(SECRET)),
            vec![(blog.name(), blog.routes())],
        )
    }

    async fn call(app: &Router, method: &str, path: &str, bearer: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(path);
        if let Some(t) = bearer {
            req = req.header("authorization", format!("Bearer {t}"));
        }
        let body = match body {
            Some(v) => {
                req = req.header("content-type", "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn system_endpoints() {
        let app = app();
        let (status, body) = call(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (_, body) = call(&app, "GET", "/version", None, None).await;
        assert_eq!(body["name"], "blogd");
    }

    #[tokio::test]
    async fn token_identity_reaches_blog_module() {
        let app = app();
        let alice = token(SECRET, "alice", 3600);

        let (status, post) = call(
            &app,
            "POST",
            "/blog/posts",
            Some(&alice),
            Some(json!({"title": "Hello", "body": "world"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(post["user"]["id"], "alice");
        assert_eq!(post["user"]["name"], "ALICE");

        let (status, page) = call(&app, "GET", "/blog/posts", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn anonymous_mutation_is_unauthorized() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/blog/posts",
            None,
            Some(json!({"title": "Hello", "body": "world"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn bad_token_is_rejected_even_on_reads() {
        let app = app();
        let (status, _) = call(&app, "GET", "/blog/posts", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
