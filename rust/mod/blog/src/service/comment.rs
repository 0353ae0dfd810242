use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use blog_core::{Page, PageQuery, Requester, is_blank, new_id, now_rfc3339};
use blog_sql::{Row, Value};

use crate::model::{CommentNode, CommentView, CreateComment, NotificationKind, UpdateComment};
use crate::service::keyset::Keyset;
use crate::service::{BlogError, BlogService, col, placeholders, user_summary};
use crate::thread::{ThreadNode, build_thread};

/// Ids per multi-row `DELETE ... IN (...)`, below SQLite's variable limit.
const DELETE_CHUNK: usize = 500;

pub(crate) const COMMENT_COLUMNS: &str = "c.id AS id, c.body AS body, c.post_id AS post_id, \
     c.parent_id AS parent_id, c.created_at AS created_at, c.updated_at AS updated_at, \
     c.user_id AS author_id, u.name AS author_name, u.image AS author_image, \
     p.title AS post_title, p.user_id AS op_id";

pub(crate) const COMMENT_FROM: &str = "comments c \
     JOIN users u ON u.id = c.user_id \
     JOIN posts p ON p.id = c.post_id";

pub(crate) fn comment_from_row(row: &Row) -> Result<CommentView, BlogError> {
    let user = user_summary(row, "author")?;
    let author_is_op = col(row, "op_id")? == user.id;
    Ok(CommentView {
        id: col(row, "id")?,
        body: col(row, "body")?,
        post_id: col(row, "post_id")?,
        parent_id: row.get_string("parent_id"),
        user,
        post_title: col(row, "post_title")?,
        author_is_op,
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

fn empty_body() -> BlogError {
    BlogError::Validation("comment can't be empty".into())
}

impl BlogService {
    pub fn get_comment(&self, id: &str) -> Result<CommentView, BlogError> {
        let row = self.query_one(
            &format!("SELECT {COMMENT_COLUMNS} FROM {COMMENT_FROM} WHERE c.id = ?1"),
            &[Value::text(id)],
            || BlogError::not_found("comment", id),
        )?;
        comment_from_row(&row)
    }

    /// Every comment of a post as a forest, newest roots first.
    pub fn list_post_comments(&self, post_id: &str) -> Result<Vec<CommentNode>, BlogError> {
        self.post_owner(post_id)?;
        let rows = self.sql.query(
            &format!(
                "SELECT {COMMENT_COLUMNS} FROM {COMMENT_FROM} WHERE c.post_id = ?1 \
                 ORDER BY c.created_at DESC, c.id DESC"
            ),
            &[Value::text(post_id)],
        )?;
        let comments = rows
            .iter()
            .map(comment_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(post_id, count = comments.len(), "loaded comment thread");
        Ok(build_thread(comments))
    }

    /// A user's comments across posts. Replies are not nested here, so
    /// every node comes back with empty `children`.
    pub fn list_user_comments(&self, user_id: &str, page: &PageQuery) -> Result<Page<CommentNode>, BlogError> {
        self.get_user(user_id)?;
        let ks = Keyset::new("comments", "c", COMMENT_COLUMNS, COMMENT_FROM)
            .filter("c.user_id = ?", vec![Value::text(user_id)]);
        Ok(self.fetch_page(ks, page, comment_from_row)?.map(ThreadNode::leaf))
    }

    /// Add a comment, or a reply when `parent_id` is set. The parent must
    /// be on the same post.
    pub fn add_comment(&self, who: &Requester, post_id: &str, input: CreateComment) -> Result<CommentView, BlogError> {
        if is_blank(&input.body) {
            return Err(empty_body());
        }
        let op = self.post_owner(post_id)?;

        let parent_id = input.parent_id.as_deref().filter(|p| !p.is_empty());
        let parent_author = match parent_id {
            Some(parent_id) => {
                let parent = self.query_one(
                    "SELECT post_id, user_id FROM comments WHERE id = ?1",
                    &[Value::text(parent_id)],
                    || BlogError::not_found("parent comment", parent_id),
                )?;
                if col(&parent, "post_id")? != post_id {
                    return Err(BlogError::Validation(
                        "parent comment belongs to a different post".into(),
                    ));
                }
                Some(col(&parent, "user_id")?)
            }
            None => None,
        };

        self.ensure_user(who)?;
        let id = new_id();
        self.sql.exec(
            "INSERT INTO comments (id, post_id, parent_id, user_id, body, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            &[
                Value::text(&id),
                Value::text(post_id),
                Value::opt_text(parent_id),
                Value::text(&who.user_id),
                Value::text(input.body),
                Value::text(now_rfc3339()),
            ],
        )?;
        info!(comment_id = %id, post_id, user_id = %who.user_id, "added comment");

        if let Some(parent_author) = &parent_author {
            self.notify(parent_author, &who.user_id, NotificationKind::Reply, Some(post_id), Some(&id))?;
        }
        if parent_author.as_deref() != Some(op.as_str()) {
            self.notify(&op, &who.user_id, NotificationKind::Comment, Some(post_id), Some(&id))?;
        }

        self.get_comment(&id)
    }

    /// Replace a comment's body. Author only.
    pub fn update_comment(&self, who: &Requester, id: &str, input: UpdateComment) -> Result<CommentView, BlogError> {
        if is_blank(&input.body) {
            return Err(empty_body());
        }
        let row = self.query_one(
            "SELECT user_id FROM comments WHERE id = ?1",
            &[Value::text(id)],
            || BlogError::not_found("comment", id),
        )?;
        if col(&row, "user_id")? != who.user_id {
            return Err(BlogError::not_owner("edit", "comment"));
        }

        self.sql.exec(
            "UPDATE comments SET body = ?1, updated_at = ?2 WHERE id = ?3",
            &[Value::text(input.body), Value::text(now_rfc3339()), Value::text(id)],
        )?;
        info!(comment_id = %id, "updated comment");
        self.get_comment(id)
    }

    /// Delete a comment and all of its replies. Author only; a comment that
    /// is already gone is a no-op. Returns the number of comments removed.
    pub fn delete_comment(&self, who: &Requester, id: &str) -> Result<usize, BlogError> {
        let rows = self.sql.query(
            "SELECT user_id FROM comments WHERE id = ?1",
            &[Value::text(id)],
        )?;
        let Some(row) = rows.first() else {
            debug!(comment_id = %id, "comment already deleted");
            return Ok(0);
        };
        if col(row, "user_id")? != who.user_id {
            return Err(BlogError::not_owner("delete", "comment"));
        }
        self.delete_comment_tree(id)
    }

    /// Remove `id` and every transitive reply, plus the notifications that
    /// point at them. No ownership check.
    ///
    /// Descendants are discovered with an explicit stack over the post's
    /// `(id, parent_id)` pairs and deleted leaf-most first in chunks.
    pub fn delete_comment_tree(&self, id: &str) -> Result<usize, BlogError> {
        let roots = self.sql.query(
            "SELECT post_id FROM comments WHERE id = ?1",
            &[Value::text(id)],
        )?;
        let Some(root) = roots.first() else {
            return Ok(0);
        };
        let post_id = col(root, "post_id")?;

        let mut replies: HashMap<String, Vec<String>> = HashMap::new();
        for row in self.sql.query(
            "SELECT id, parent_id FROM comments WHERE post_id = ?1",
            &[Value::text(&post_id)],
        )? {
            if let Some(parent) = row.get_string("parent_id") {
                replies.entry(parent).or_default().push(col(&row, "id")?);
            }
        }

        let mut seen: HashSet<String> = HashSet::from([id.to_string()]);
        let mut stack = vec![id.to_string()];
        let mut doomed = Vec::new();
        while let Some(current) = stack.pop() {
            if let Some(children) = replies.get(&current) {
                for child in children {
                    if seen.insert(child.clone()) {
                        stack.push(child.clone());
                    }
                }
            }
            doomed.push(current);
        }
        doomed.reverse();

        let mut removed = 0;
        for chunk in doomed.chunks(DELETE_CHUNK) {
            let list = placeholders(chunk.len());
            let params: Vec<Value> = chunk.iter().map(Value::text).collect();
            self.sql.exec(
                &format!("DELETE FROM notifications WHERE comment_id IN ({list})"),
                &params,
            )?;
            removed += self
                .sql
                .exec(&format!("DELETE FROM comments WHERE id IN ({list})"), &params)?;
        }

        info!(comment_id = %id, post_id = %post_id, removed, "deleted comment tree");
        Ok(removed as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CreatePost, NotificationQuery};
    use crate::service::testutil::*;
    use crate::thread::forest_size;

    fn post(svc: &BlogService, who: &Requester) -> String {
        svc.create_post(
            who,
            CreatePost {
                title: "Post".into(),
                body: "body".into(),
                tags: vec![],
                poll: None,
            },
        )
        .unwrap()
        .post
        .id
    }

    fn comment(svc: &BlogService, who: &Requester, post_id: &str, parent: Option<&str>) -> String {
        svc.add_comment(
            who,
            post_id,
            CreateComment {
                body: "text".into(),
                parent_id: parent.map(Into::into),
            },
        )
        .unwrap()
        .id
    }

    fn comment_count(svc: &BlogService) -> i64 {
        svc.count("SELECT COUNT(*) AS n FROM comments", &[]).unwrap()
    }

    #[test]
    fn thread_nests_replies() {
        let svc = service();
        let p = post(&svc, &alice());
        let a = comment(&svc, &bob(), &p, None);
        let _b = comment(&svc, &carol(), &p, None);
        let c = comment(&svc, &alice(), &p, Some(&a));

        let forest = svc.list_post_comments(&p).unwrap();
        assert_eq!(forest.len(), 2);
        assert_eq!(forest_size(&forest), 3);
        let root_a = forest.iter().find(|n| n.item.id == a).unwrap();
        assert_eq!(root_a.children.len(), 1);
        assert_eq!(root_a.children[0].item.id, c);
        assert!(root_a.children[0].item.author_is_op);
        assert!(!root_a.item.author_is_op);
        assert!(forest.iter().all(|n| n.item.id != c));
    }

    #[test]
    fn thread_for_missing_post_not_found() {
        let svc = service();
        assert!(matches!(svc.list_post_comments("nope"), Err(BlogError::NotFound(_))));
    }

    #[test]
    fn blank_body_rejected_before_lookup() {
        let svc = service();
        let err = svc
            .add_comment(
                &bob(),
                "no-such-post",
                CreateComment { body: " \n ".into(), parent_id: None },
            )
            .unwrap_err();
        assert!(matches!(err, BlogError::Validation(_)));
        assert_eq!(comment_count(&svc), 0);
    }

    #[test]
    fn parent_must_share_post() {
        let svc = service();
        let p1 = post(&svc, &alice());
        let p2 = post(&svc, &alice());
        let parent = comment(&svc, &bob(), &p1, None);
        let err = svc
            .add_comment(
                &bob(),
                &p2,
                CreateComment { body: "x".into(), parent_id: Some(parent) },
            )
            .unwrap_err();
        assert!(matches!(err, BlogError::Validation(_)));

        let err = svc
            .add_comment(
                &bob(),
                &p1,
                CreateComment { body: "x".into(), parent_id: Some("gone".into()) },
            )
            .unwrap_err();
        assert!(matches!(err, BlogError::NotFound(_)));
    }

    #[test]
    fn empty_parent_id_is_top_level() {
        let svc = service();
        let p = post(&svc, &alice());
        let c = svc
            .add_comment(
                &bob(),
                &p,
                CreateComment { body: "x".into(), parent_id: Some(String::new()) },
            )
            .unwrap();
        assert_eq!(c.parent_id, None);

        let forest = svc.list_post_comments(&p).unwrap();
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].item.id, c.id);
    }

    #[test]
    fn delete_removes_descendants() {
        let svc = service();
        let p = post(&svc, &alice());
        let root = comment(&svc, &bob(), &p, None);
        let child1 = comment(&svc, &carol(), &p, Some(&root));
        let _child2 = comment(&svc, &alice(), &p, Some(&root));
        let _grandchild = comment(&svc, &bob(), &p, Some(&child1));
        let _other = comment(&svc, &carol(), &p, None);

        assert_eq!(svc.delete_comment(&bob(), &root).unwrap(), 4);
        assert_eq!(comment_count(&svc), 1);
        assert_eq!(svc.delete_comment(&bob(), &root).unwrap(), 0);
    }

    #[test]
    fn delete_is_author_only() {
        let svc = service();
        let p = post(&svc, &alice());
        let root = comment(&svc, &bob(), &p, None);
        comment(&svc, &carol(), &p, Some(&root));

        let err = svc.delete_comment(&carol(), &root).unwrap_err();
        assert!(matches!(err, BlogError::Forbidden(_)));
        assert_eq!(comment_count(&svc), 2);
    }

    #[test]
    fn delete_drops_notifications() {
        let svc = service();
        let p = post(&svc, &alice());
        let root = comment(&svc, &bob(), &p, None);
        assert_eq!(svc.unread_count("alice").unwrap().total, 1);
        svc.delete_comment(&bob(), &root).unwrap();
        assert_eq!(svc.unread_count("alice").unwrap().total, 0);
    }

    #[test]
    fn delete_long_chain_in_chunks() {
        let svc = service();
        let p = post(&svc, &alice());
        let now = now_rfc3339();
        let mut parent: Option<String> = None;
        for i in 0..1_200 {
            let id = format!("c{i:04}");
            svc.sql
                .exec(
                    "INSERT INTO comments (id, post_id, parent_id, user_id, body, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, 'alice', 'x', ?4, ?4)",
                    &[
                        Value::text(&id),
                        Value::text(&p),
                        Value::opt_text(parent.as_deref()),
                        Value::text(&now),
                    ],
                )
                .unwrap();
            parent = Some(id);
        }
        assert_eq!(svc.delete_comment_tree("c0000").unwrap(), 1_200);
        assert_eq!(comment_count(&svc), 0);
    }

    #[test]
    fn update_checks_owner_and_body() {
        let svc = service();
        let p = post(&svc, &alice());
        let id = comment(&svc, &bob(), &p, None);

        let err = svc
            .update_comment(&carol(), &id, UpdateComment { body: "hijack".into() })
            .unwrap_err();
        assert!(matches!(err, BlogError::Forbidden(_)));

        let err = svc
            .update_comment(&bob(), &id, UpdateComment { body: "".into() })
            .unwrap_err();
        assert!(matches!(err, BlogError::Validation(_)));

        let err = svc
            .update_comment(&bob(), "gone", UpdateComment { body: "x".into() })
            .unwrap_err();
        assert!(matches!(err, BlogError::NotFound(_)));

        let updated = svc
            .update_comment(&bob(), &id, UpdateComment { body: "edited".into() })
            .unwrap();
        assert_eq!(updated.body, "edited");
    }

    #[test]
    fn user_comments_are_flat_pages() {
        let svc = service();
        let p = post(&svc, &alice());
        let root = comment(&svc, &bob(), &p, None);
        for _ in 0..3 {
            comment(&svc, &bob(), &p, Some(&root));
        }
        comment(&svc, &carol(), &p, None);

        let first = svc.list_user_comments("bob", &PageQuery::first(3)).unwrap();
        assert_eq!(first.items.len(), 3);
        assert!(first.items.iter().all(|n| n.children.is_empty()));
        let second = svc
            .list_user_comments("bob", &PageQuery::first(3).at(first.next_cursor.unwrap()))
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(second.next_cursor.is_none());
    }

    #[test]
    fn reply_notifies_parent_author_and_op() {
        let svc = service();
        let p = post(&svc, &alice());
        let root = comment(&svc, &bob(), &p, None);
        comment(&svc, &carol(), &p, Some(&root));

        let bob_inbox = svc
            .list_notifications(&bob(), &NotificationQuery::default())
            .unwrap();
        assert_eq!(bob_inbox.items.len(), 1);
        assert_eq!(bob_inbox.items[0].kind, NotificationKind::Reply);

        // One for bob's comment, one for carol's reply.
        let alice_inbox = svc
            .list_notifications(&alice(), &NotificationQuery::default())
            .unwrap();
        assert_eq!(alice_inbox.items.len(), 2);
        assert!(alice_inbox.items.iter().all(|n| n.kind == NotificationKind::Comment));
    }
}
