use serde::Serialize;

use super::user::UserSummary;

/// A follow relation, seen from one side.
///
/// In a followers list `user` is the follower; in a following list it is
/// the followed user.
#[derive(Debug, Clone, Serialize)]
pub struct FollowView {
    pub id: String,
    pub user: UserSummary,
    pub created_at: String,
}
