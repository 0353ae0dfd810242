use serde::{Deserialize, Serialize};

use super::user::UserSummary;

/// What triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// Someone commented on your post.
    Comment,
    /// Someone replied to your comment.
    Reply,
    /// Someone followed you.
    Follow,
    /// Someone liked your post.
    Like,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Comment => "comment",
            Self::Reply => "reply",
            Self::Follow => "follow",
            Self::Like => "like",
        }
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comment" => Ok(Self::Comment),
            "reply" => Ok(Self::Reply),
            "follow" => Ok(Self::Follow),
            "like" => Ok(Self::Like),
            _ => Err(format!("unknown notification kind: {s}")),
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: String,
    /// Recipient.
    pub user_id: String,
    pub actor: UserSummary,
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_id: Option<String>,
    pub read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnreadCount {
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parses_its_own_name() {
        for kind in [
            NotificationKind::Comment,
            NotificationKind::Reply,
            NotificationKind::Follow,
            NotificationKind::Like,
        ] {
            assert_eq!(kind.as_str().parse::<NotificationKind>(), Ok(kind));
        }
        assert!("mention".parse::<NotificationKind>().is_err());
    }
}
