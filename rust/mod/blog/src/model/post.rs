use serde::{Deserialize, Serialize};

use super::poll::{CreatePoll, PollView};
use super::user::UserSummary;

/// A post as it appears in feeds and search results.
#[derive(Debug, Clone, Serialize)]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    /// Raw markdown.
    pub body: String,
    pub tags: Vec<String>,
    pub user: UserSummary,
    pub likes: i64,
    pub dislikes: i64,
    pub comments: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// A single post page, personalised for the viewer.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    #[serde(flatten)]
    pub post: PostSummary,
    pub liked_by_me: bool,
    pub disliked_by_me: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll: Option<PollView>,
}

/// Input for creating a post.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePost {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub poll: Option<CreatePoll>,
}

/// Input for editing a post. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePost {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// Input for `POST /posts/{id}/@like`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LikeInput {
    #[serde(default)]
    pub dislike: bool,
}

/// Reaction counts after a like/dislike toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikeState {
    pub likes: i64,
    pub dislikes: i64,
    pub liked_by_me: bool,
    pub disliked_by_me: bool,
}
