use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use blog_core::{Page, Requester, ServiceError};

use crate::api::AppState;
use crate::model::{Notification, NotificationQuery, UnreadCount};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/@unread", get(unread_count))
        .route("/notifications/@read-all", post(mark_all_read))
        .route("/notifications/{id}/@read", post(mark_read))
}

async fn list_notifications(
    State(svc): State<AppState>,
    who: Requester,
    Query(query): Query<NotificationQuery>,
) -> Result<Json<Page<Notification>>, ServiceError> {
    Ok(Json(svc.list_notifications(&who, &query)?))
}

async fn unread_count(
    State(svc): State<AppState>,
    who: Requester,
) -> Result<Json<UnreadCount>, ServiceError> {
    Ok(Json(svc.unread_count(&who.user_id)?))
}

async fn mark_read(
    State(svc): State<AppState>,
    who: Requester,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.mark_read(&who, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_all_read(
    State(svc): State<AppState>,
    who: Requester,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let updated = svc.mark_all_read(&who)?;
    Ok(Json(json!({ "updated": updated })))
}
