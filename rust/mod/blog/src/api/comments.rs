use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::put;
use axum::{Json, Router};

use blog_core::{Requester, ServiceError};

use crate::api::AppState;
use crate::model::{CommentView, UpdateComment};

pub fn routes() -> Router<AppState> {
    Router::new().route("/comments/{id}", put(update_comment).delete(delete_comment))
}

async fn update_comment(
    State(svc): State<AppState>,
    who: Requester,
    Path(id): Path<String>,
    Json(input): Json<UpdateComment>,
) -> Result<Json<CommentView>, ServiceError> {
    Ok(Json(svc.update_comment(&who, &id, input)?))
}

/// Deletes the comment and its replies. Already-deleted is still 204.
async fn delete_comment(
    State(svc): State<AppState>,
    who: Requester,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_comment(&who, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
