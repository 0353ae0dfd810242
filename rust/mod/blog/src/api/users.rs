use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use blog_core::{Page, Requester, ServiceError, Viewer};

use crate::api::AppState;
use crate::model::{CommentNode, FollowView, ListQuery, UpdateProfile, User, UserProfile};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/@me", put(update_me))
        .route("/users/{id}", get(get_profile))
        .route("/users/{id}/@follow", post(follow).delete(unfollow))
        .route("/users/{id}/followers", get(followers))
        .route("/users/{id}/following", get(following))
        .route("/users/{id}/comments", get(user_comments))
}

async fn update_me(
    State(svc): State<AppState>,
    who: Requester,
    Json(input): Json<UpdateProfile>,
) -> Result<Json<User>, ServiceError> {
    Ok(Json(svc.upsert_profile(&who, input)?))
}

async fn get_profile(
    State(svc): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> Result<Json<UserProfile>, ServiceError> {
    Ok(Json(svc.get_profile(&id, viewer.user_id())?))
}

async fn follow(
    State(svc): State<AppState>,
    who: Requester,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<FollowView>), ServiceError> {
    let view = svc.follow(&who, &id)?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn unfollow(
    State(svc): State<AppState>,
    who: Requester,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.unfollow(&who, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn followers(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<FollowView>>, ServiceError> {
    Ok(Json(svc.followers(&id, &query.page())?))
}

async fn following(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<FollowView>>, ServiceError> {
    Ok(Json(svc.following(&id, &query.page())?))
}

async fn user_comments(
    State(svc): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Page<CommentNode>>, ServiceError> {
    Ok(Json(svc.list_user_comments(&id, &query.page())?))
}
