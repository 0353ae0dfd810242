mod comments;
mod notifications;
mod posts;
mod search;
mod users;

use std::sync::Arc;

use axum::Router;

use crate::service::BlogService;

/// Shared application state.
pub type AppState = Arc<BlogService>;

/// Build the complete blog API router.
///
/// All routes are relative; the server nests them under `/blog`. Identity
/// is read from request extensions, so whatever sits in front must attach a
/// `Requester` for signed-in callers.
pub fn build_router(svc: Arc<BlogService>) -> Router {
    Router::new()
        .merge(users::routes())
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(notifications::routes())
        .merge(search::routes())
        .with_state(svc)
}
