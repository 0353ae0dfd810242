use tracing::{debug, info};

use blog_core::{Page, Requester, new_id, now_rfc3339};
use blog_sql::{Row, Value};

use crate::model::{Notification, NotificationKind, NotificationQuery, UnreadCount};
use crate::service::keyset::Keyset;
use crate::service::{BlogError, BlogService, col, user_summary};

const NOTIFICATION_COLUMNS: &str = "n.id AS id, n.user_id AS user_id, n.kind AS kind, \
     n.post_id AS post_id, n.comment_id AS comment_id, n.read AS read, n.created_at AS created_at, \
     a.id AS actor_id, a.name AS actor_name, a.image AS actor_image";

const NOTIFICATION_FROM: &str = "notifications n JOIN users a ON a.id = n.actor_id";

fn notification_from_row(row: &Row) -> Result<Notification, BlogError> {
    let kind = col(row, "kind")?;
    Ok(Notification {
        id: col(row, "id")?,
        user_id: col(row, "user_id")?,
        actor: user_summary(row, "actor")?,
        kind: kind.parse::<NotificationKind>().map_err(BlogError::Internal)?,
        post_id: row.get_string("post_id"),
        comment_id: row.get_string("comment_id"),
        read: row.get_bool("read").unwrap_or(false),
        created_at: col(row, "created_at")?,
    })
}

impl BlogService {
    /// Record a notification for `recipient`. Acting on your own content
    /// notifies nobody.
    pub(crate) fn notify(
        &self,
        recipient: &str,
        actor: &str,
        kind: NotificationKind,
        post_id: Option<&str>,
        comment_id: Option<&str>,
    ) -> Result<(), BlogError> {
        if recipient == actor {
            return Ok(());
        }
        self.sql.exec(
            "INSERT INTO notifications (id, user_id, actor_id, kind, post_id, comment_id, read, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)",
            &[
                Value::text(new_id()),
                Value::text(recipient),
                Value::text(actor),
                Value::text(kind.as_str()),
                Value::opt_text(post_id),
                Value::opt_text(comment_id),
                Value::text(now_rfc3339()),
            ],
        )?;
        debug!(recipient, actor, %kind, "notification recorded");
        Ok(())
    }

    /// The requester's notifications, newest first, optionally by read state.
    pub fn list_notifications(
        &self,
        who: &Requester,
        query: &NotificationQuery,
    ) -> Result<Page<Notification>, BlogError> {
        let mut ks = Keyset::new("notifications", "n", NOTIFICATION_COLUMNS, NOTIFICATION_FROM)
            .filter("n.user_id = ?", vec![Value::text(&who.user_id)]);
        if let Some(read) = query.read {
            ks = ks.filter("n.read = ?", vec![Value::bool(read)]);
        }
        self.fetch_page(ks, &query.page(), notification_from_row)
    }

    pub fn unread_count(&self, user_id: &str) -> Result<UnreadCount, BlogError> {
        let total = self.count(
            "SELECT COUNT(*) AS n FROM notifications WHERE user_id = ?1 AND read = 0",
            &[Value::text(user_id)],
        )?;
        Ok(UnreadCount { total })
    }

    /// Mark one notification read. Only its recipient may.
    pub fn mark_read(&self, who: &Requester, id: &str) -> Result<(), BlogError> {
        let row = self.query_one(
            "SELECT user_id FROM notifications WHERE id = ?1",
            &[Value::text(id)],
            || BlogError::not_found("notification", id),
        )?;
        if col(&row, "user_id")? != who.user_id {
            return Err(BlogError::not_owner("mark", "notification"));
        }
        self.sql.exec(
            "UPDATE notifications SET read = 1 WHERE id = ?1",
            &[Value::text(id)],
        )?;
        Ok(())
    }

    /// Mark every unread notification of the requester read. Returns how
    /// many changed.
    pub fn mark_all_read(&self, who: &Requester) -> Result<u64, BlogError> {
        let changed = self.sql.exec(
            "UPDATE notifications SET read = 1 WHERE user_id = ?1 AND read = 0",
            &[Value::text(&who.user_id)],
        )?;
        info!(user_id = %who.user_id, changed, "marked notifications read");
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testutil::*;

    fn seed(svc: &BlogService, n: usize) {
        svc.ensure_user(&alice()).unwrap();
        svc.ensure_user(&bob()).unwrap();
        for _ in 0..n {
            svc.notify("alice", "bob", NotificationKind::Follow, None, None)
                .unwrap();
        }
    }

    #[test]
    fn self_actions_are_silent() {
        let svc = service();
        svc.ensure_user(&alice()).unwrap();
        svc.notify("alice", "alice", NotificationKind::Like, Some("p1"), None)
            .unwrap();
        assert_eq!(svc.unread_count("alice").unwrap().total, 0);
    }

    #[test]
    fn list_and_filter_by_read() {
        let svc = service();
        seed(&svc, 3);
        let all = svc
            .list_notifications(&alice(), &NotificationQuery::default())
            .unwrap();
        assert_eq!(all.items.len(), 3);
        assert_eq!(all.items[0].actor.name, "Bob");
        assert_eq!(all.items[0].kind, NotificationKind::Follow);

        svc.mark_read(&alice(), &all.items[0].id).unwrap();
        let unread = svc
            .list_notifications(
                &alice(),
                &NotificationQuery {
                    read: Some(false),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(unread.items.len(), 2);
        assert_eq!(svc.unread_count("alice").unwrap().total, 2);
    }

    #[test]
    fn others_see_nothing() {
        let svc = service();
        seed(&svc, 2);
        let page = svc
            .list_notifications(&bob(), &NotificationQuery::default())
            .unwrap();
        assert!(page.items.is_empty());
    }

    #[test]
    fn mark_read_checks_recipient() {
        let svc = service();
        seed(&svc, 1);
        let id = svc
            .list_notifications(&alice(), &NotificationQuery::default())
            .unwrap()
            .items[0]
            .id
            .clone();
        assert!(matches!(svc.mark_read(&bob(), &id), Err(BlogError::Forbidden(_))));
        assert!(matches!(svc.mark_read(&alice(), "nope"), Err(BlogError::NotFound(_))));
    }

    #[test]
    fn mark_all_read_counts_changes() {
        let svc = service();
        seed(&svc, 4);
        assert_eq!(svc.mark_all_read(&alice()).unwrap(), 4);
        assert_eq!(svc.mark_all_read(&alice()).unwrap(), 0);
        assert_eq!(svc.unread_count("alice").unwrap().total, 0);
    }

    #[test]
    fn paginates() {
        let svc = service();
        seed(&svc, 5);
        let query = NotificationQuery {
            limit: Some(3),
            ..Default::default()
        };
        let first = svc.list_notifications(&alice(), &query).unwrap();
        assert_eq!(first.items.len(), 3);
        let next = NotificationQuery {
            cursor: first.next_cursor.clone(),
            ..query
        };
        let second = svc.list_notifications(&alice(), &next).unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(second.next_cursor.is_none());
    }
}
