//! JWT authentication middleware.
//!
//! Reads `Authorization: Bearer <token>`, validates it (HS256) and attaches
//! a [`Requester`] to the request. Requests without the header pass through
//! anonymously; each handler decides whether it needs an identity. A header
//! that is present but invalid is rejected outright.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use blog_core::{Requester, ServiceError};

/// JWT claims payload issued by the external identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user id.
    pub sub: String,
    /// Display name.
    pub name: String,
    /// Issued at (unix timestamp).
    #[serde(default)]
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

/// Shared JWT configuration for the middleware.
#[derive(Clone)]
pub struct JwtState {
    pub decoding_key: DecodingKey,
    pub validation: Validation,
}

impl JwtState {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }
}

pub async fn auth_middleware(
    State(jwt_state): State<Arc<JwtState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    let Some(header) = request.headers().get(AUTHORIZATION) else {
        return Ok(next.run(request).await);
    };

    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ServiceError::Unauthorized("malformed authorization header".into()))?;

    let token_data = jsonwebtoken::decode::<Claims>(
        token,
        &jwt_state.decoding_key,
        &jwt_state.validation,
    )
    .map_err(|e| ServiceError::Unauthorized(format!("invalid token: {e}")))?;

    let claims = token_data.claims;
    debug!(user_id = %claims.sub, "authenticated request");
    request
        .extensions_mut()
        .insert(Requester::new(claims.sub, claims.name));

    Ok(next.run(request).await)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use axum::Router;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::middleware;
    use axum::routing::get;
    use blog_core::Viewer;
    use jsonwebtoken::{EncodingKey, Header};
    use tower::ServiceExt;

    use super::*;

    pub const SECRET: &str = "test-secret";

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    pub fn token(secret: &str, sub: &str, exp_offset: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            name: sub.to_uppercase(),
            iat: now(),
            exp: now() + exp_offset,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    async fn whoami(viewer: Viewer) -> String {
        viewer.user_id().unwrap_or("anonymous").to_string()
    }

    fn app() -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn_with_state(
                Arc::new(JwtState::from_secret(SECRET)),
                auth_middleware,
            ))
    }

    async fn send(auth: Option<String>) -> (StatusCode, String) {
        let mut req = axum::http::Request::builder().uri("/whoami");
        if let Some(value) = auth {
            req = req.header(AUTHORIZATION, value);
        }
        let resp = app().oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn anonymous_passes_through() {
        let (status, body) = send(None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "anonymous");
    }

    #[tokio::test]
    async fn valid_token_sets_requester() {
        let (status, body) = send(Some(format!("Bearer {}", token(SECRET, "alice", 3600)))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "alice");
    }

    #[tokio::test]
    async fn wrong_secret_rejected() {
        let (status, body) = send(Some(format!("Bearer {}", token("other", "alice", 3600)))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body.contains("UNAUTHENTICATED"));
    }

    #[tokio::test]
    async fn expired_token_rejected() {
        let (status, _) = send(Some(format!("Bearer {}", token(SECRET, "alice", -3600)))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_header_rejected() {
        let (status, _) = send(Some("Basic YWxpY2U6cHc=".to_string())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
