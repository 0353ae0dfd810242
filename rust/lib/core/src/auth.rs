//! Request identity for handlers.
//!
//! Token validation lives in the server binary. Its middleware attaches a
//! [`Requester`] to the request extensions when a valid bearer token is
//! present; handlers pull it back out with the extractors below and never
//! look at headers themselves.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::ServiceError;

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requester {
    /// Token subject, used as the user id everywhere.
    pub user_id: String,
    /// Display name carried in the token.
    pub name: String,
}

impl Requester {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            name: name.into(),
        }
    }
}

/// Extracting `Requester` rejects anonymous requests with 401.
impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Requester>()
            .cloned()
            .ok_or_else(|| ServiceError::Unauthorized("sign in required".into()))
    }
}

/// Optional identity for read endpoints that personalise their output
/// (`liked_by_me`, `followed_by_me`, ...). Never rejects.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<Requester>);

impl Viewer {
    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(|r| r.user_id.as_str())
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Viewer(parts.extensions.get::<Requester>().cloned()))
    }
}
