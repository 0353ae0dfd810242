use tracing::info;

use blog_core::{Page, PageQuery, Requester, new_id, now_rfc3339};
use blog_sql::{Row, Value};

use crate::model::{FollowView, NotificationKind};
use crate::service::keyset::Keyset;
use crate::service::{BlogError, BlogService, col, user_summary};

const FOLLOW_COLUMNS: &str = "f.id AS id, f.created_at AS created_at, \
     u.id AS other_id, u.name AS other_name, u.image AS other_image";

const FOLLOWERS_FROM: &str = "follows f JOIN users u ON u.id = f.follower_id";
const FOLLOWING_FROM: &str = "follows f JOIN users u ON u.id = f.following_id";

fn follow_from_row(row: &Row) -> Result<FollowView, BlogError> {
    Ok(FollowView {
        id: col(row, "id")?,
        user: user_summary(row, "other")?,
        created_at: col(row, "created_at")?,
    })
}

impl BlogService {
    /// Follow `target`. Following yourself or following twice is rejected.
    pub fn follow(&self, who: &Requester, target: &str) -> Result<FollowView, BlogError> {
        if who.user_id == target {
            return Err(BlogError::Validation("you can't follow yourself".into()));
        }
        let user = self.user_summary_of(target)?;
        self.ensure_user(who)?;

        let id = new_id();
        let now = now_rfc3339();
        self.sql
            .exec(
                "INSERT INTO follows (id, follower_id, following_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                &[
                    Value::text(&id),
                    Value::text(&who.user_id),
                    Value::text(target),
                    Value::text(&now),
                ],
            )
            .map_err(|e| {
                if e.is_constraint() {
                    BlogError::Conflict(format!("already following {target}"))
                } else {
                    e.into()
                }
            })?;
        info!(follower = %who.user_id, following = %target, "followed user");

        self.notify(target, &who.user_id, NotificationKind::Follow, None, None)?;
        Ok(FollowView {
            id,
            user,
            created_at: now,
        })
    }

    pub fn unfollow(&self, who: &Requester, target: &str) -> Result<(), BlogError> {
        let removed = self.sql.exec(
            "DELETE FROM follows WHERE follower_id = ?1 AND following_id = ?2",
            &[Value::text(&who.user_id), Value::text(target)],
        )?;
        if removed == 0 {
            return Err(BlogError::NotFound(format!("not following {target}")));
        }
        info!(follower = %who.user_id, following = %target, "unfollowed user");
        Ok(())
    }

    pub fn is_following(&self, follower: &str, following: &str) -> Result<bool, BlogError> {
        self.exists(
            "SELECT 1 FROM follows WHERE follower_id = ?1 AND following_id = ?2",
            &[Value::text(follower), Value::text(following)],
        )
    }

    /// Users following `id`, most recent follow first.
    pub fn followers(&self, id: &str, page: &PageQuery) -> Result<Page<FollowView>, BlogError> {
        self.get_user(id)?;
        let ks = Keyset::new("follows", "f", FOLLOW_COLUMNS, FOLLOWERS_FROM)
            .filter("f.following_id = ?", vec![Value::text(id)]);
        self.fetch_page(ks, page, follow_from_row)
    }

    /// Users `id` follows.
    pub fn following(&self, id: &str, page: &PageQuery) -> Result<Page<FollowView>, BlogError> {
        self.get_user(id)?;
        let ks = Keyset::new("follows", "f", FOLLOW_COLUMNS, FOLLOWING_FROM)
            .filter("f.follower_id = ?", vec![Value::text(id)]);
        self.fetch_page(ks, page, follow_from_row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testutil::*;

    #[test]
    fn follow_and_list_both_sides() {
        let svc = service();
        svc.ensure_user(&alice()).unwrap();
        svc.ensure_user(&bob()).unwrap();
        let f = svc.follow(&bob(), "alice").unwrap();
        assert_eq!(f.user.id, "alice");

        let followers = svc.followers("alice", &PageQuery::default()).unwrap();
        assert_eq!(followers.items.len(), 1);
        assert_eq!(followers.items[0].user.name, "Bob");

        let following = svc.following("bob", &PageQuery::default()).unwrap();
        assert_eq!(following.items[0].user.id, "alice");
    }

    #[test]
    fn self_follow_rejected() {
        let svc = service();
        svc.ensure_user(&alice()).unwrap();
        let err = svc.follow(&alice(), "alice").unwrap_err();
        assert!(matches!(err, BlogError::Validation(_)));
    }

    #[test]
    fn duplicate_follow_conflicts() {
        let svc = service();
        svc.ensure_user(&alice()).unwrap();
        svc.follow(&bob(), "alice").unwrap();
        let err = svc.follow(&bob(), "alice").unwrap_err();
        assert!(matches!(err, BlogError::Conflict(_)));
    }

    #[test]
    fn follow_unknown_user_not_found() {
        let svc = service();
        let err = svc.follow(&bob(), "ghost").unwrap_err();
        assert!(matches!(err, BlogError::NotFound(_)));
    }

    #[test]
    fn unfollow_requires_follow() {
        let svc = service();
        svc.ensure_user(&alice()).unwrap();
        assert!(matches!(svc.unfollow(&bob(), "alice"), Err(BlogError::NotFound(_))));
        svc.follow(&bob(), "alice").unwrap();
        svc.unfollow(&bob(), "alice").unwrap();
        assert!(!svc.is_following("bob", "alice").unwrap());
    }

    #[test]
    fn follow_notifies_target() {
        let svc = service();
        svc.ensure_user(&alice()).unwrap();
        svc.follow(&bob(), "alice").unwrap();
        assert_eq!(svc.unread_count("alice").unwrap().total, 1);
    }
}
