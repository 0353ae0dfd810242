use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use blog_core::{Page, ServiceError};

use crate::api::AppState;
use crate::model::{SearchHit, SearchQuery};

pub fn routes() -> Router<AppState> {
    Router::new().route("/search", get(search))
}

async fn search(
    State(svc): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Page<SearchHit>>, ServiceError> {
    Ok(Json(svc.search(&query)?))
}
