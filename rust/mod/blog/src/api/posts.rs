use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use blog_core::{Page, Requester, ServiceError, Viewer};

use crate::api::AppState;
use crate::model::{
    CommentView, CreateComment, CreatePost, LikeInput, LikeState, ListQuery, PollView,
    PostListQuery, PostSummary, PostView, UpdatePost, VoteInput,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/@following", get(following_posts))
        .route("/posts/@liked", get(liked_posts))
        .route("/posts/{id}", get(get_post).put(update_post).delete(delete_post))
        .route("/posts/{id}/@like", post(like_post))
        .route("/posts/{id}/@vote", post(vote))
        .route("/posts/{id}/comments", get(list_comments).post(add_comment))
}

async fn list_posts(
    State(svc): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> Result<Json<Page<PostSummary>>, ServiceError> {
    Ok(Json(svc.list_posts(&query)?))
}

async fn create_post(
    State(svc): State<AppState>,
    who: Requester,
    Json(input): Json<CreatePost>,
) -> Result<(StatusCode, Json<PostView>), ServiceError> {
    let post = svc.create_post(&who, input)?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn following_posts(
    State(svc): State<AppState>,
    who: Requester,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<PostSummary>>, ServiceError> {
    Ok(Json(svc.following_posts(&who, &query.page())?))
}

async fn liked_posts(
    State(svc): State<AppState>,
    who: Requester,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<PostSummary>>, ServiceError> {
    Ok(Json(svc.liked_posts(&who, &query.page())?))
}

async fn get_post(
    State(svc): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<Json<PostView>, ServiceError> {
    Ok(Json(svc.get_post(&id, viewer.user_id())?))
}

async fn update_post(
    State(svc): State<AppState>,
    who: Requester,
    Path(id): Path<String>,
    Json(input): Json<UpdatePost>,
) -> Result<Json<PostView>, ServiceError> {
    Ok(Json(svc.update_post(&who, &id, input)?))
}

async fn delete_post(
    State(svc): State<AppState>,
    who: Requester,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_post(&who, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn like_post(
    State(svc): State<AppState>,
    who: Requester,
    Path(id): Path<String>,
    Json(input): Json<LikeInput>,
) -> Result<Json<LikeState>, ServiceError> {
    Ok(Json(svc.like_post(&who, &id, input.dislike)?))
}

async fn vote(
    State(svc): State<AppState>,
    who: Requester,
    Path(id): Path<String>,
    Json(input): Json<VoteInput>,
) -> Result<Json<PollView>, ServiceError> {
    Ok(Json(svc.vote(&who, &id, &input.option_id)?))
}

/// The whole thread; not paginated.
async fn list_comments(
    State(svc): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let forest = svc.list_post_comments(&id)?;
    Ok(Json(json!({ "items": forest })))
}

async fn add_comment(
    State(svc): State<AppState>,
    who: Requester,
    Path(id): Path<String>,
    Json(input): Json<CreateComment>,
) -> Result<(StatusCode, Json<CommentView>), ServiceError> {
    let comment = svc.add_comment(&who, &id, input)?;
    Ok((StatusCode::CREATED, Json(comment)))
}
