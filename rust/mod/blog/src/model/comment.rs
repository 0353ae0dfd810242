use serde::{Deserialize, Serialize};

use super::user::UserSummary;
use crate::thread::{ThreadNode, Threaded};

/// A comment joined with its author and post.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    pub id: String,
    /// Raw markdown, never rendered here.
    pub body: String,
    pub post_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub user: UserSummary,
    pub post_title: String,
    /// The comment author also wrote the post.
    pub author_is_op: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl Threaded for CommentView {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }
}

/// A comment with its replies nested under `children`.
pub type CommentNode = ThreadNode<CommentView>;

/// Input for adding a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateComment {
    pub body: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Input for editing a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateComment {
    pub body: String,
}
