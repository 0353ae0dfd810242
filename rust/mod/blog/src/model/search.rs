use serde::{Deserialize, Serialize};

use super::comment::CommentView;
use super::post::PostSummary;
use super::user::UserSummary;

/// Which content type `GET /search` looks through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    #[default]
    Posts,
    Comments,
    Users,
    Tags,
}

#[derive(Debug, Clone, Serialize)]
pub struct TagView {
    pub id: String,
    pub name: String,
    /// Number of posts carrying the tag.
    pub posts: i64,
}

/// One search result, tagged with its content type.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SearchHit {
    Post(PostSummary),
    Comment(CommentView),
    User(UserSummary),
    Tag(TagView),
}
