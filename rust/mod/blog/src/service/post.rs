use tracing::info;

use blog_core::{Page, PageQuery, Requester, is_blank, new_id, now_rfc3339};
use blog_sql::{Row, Value};

use crate::model::{
    CreatePost, LikeState, NotificationKind, PostListQuery, PostSummary, PostView, UpdatePost,
};
use crate::service::keyset::Keyset;
use crate::service::poll::validate_poll;
use crate::service::{BlogError, BlogService, col, int, user_summary};

pub(crate) const POST_COLUMNS: &str = "p.id AS id, p.title AS title, p.body AS body, \
     p.tags AS tags, p.created_at AS created_at, p.updated_at AS updated_at, \
     p.user_id AS author_id, u.name AS author_name, u.image AS author_image, \
     (SELECT COUNT(*) FROM likes lk WHERE lk.post_id = p.id AND lk.dislike = 0) AS likes, \
     (SELECT COUNT(*) FROM likes lk WHERE lk.post_id = p.id AND lk.dislike = 1) AS dislikes, \
     (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comments";

pub(crate) const POST_FROM: &str = "posts p JOIN users u ON u.id = p.user_id";

const LIKED_FROM: &str = "likes l \
     JOIN posts p ON p.id = l.post_id \
     JOIN users u ON u.id = p.user_id";

pub(crate) fn post_from_row(row: &Row) -> Result<PostSummary, BlogError> {
    let tags = col(row, "tags")?;
    Ok(PostSummary {
        id: col(row, "id")?,
        title: col(row, "title")?,
        body: col(row, "body")?,
        tags: serde_json::from_str(&tags).map_err(|e| BlogError::Internal(e.to_string()))?,
        user: user_summary(row, "author")?,
        likes: int(row, "likes"),
        dislikes: int(row, "dislikes"),
        comments: int(row, "comments"),
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

/// Trimmed, non-empty, first occurrence wins.
fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_string();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

impl BlogService {
    /// Author of a post; `NotFound` if it does not exist.
    pub(crate) fn post_owner(&self, post_id: &str) -> Result<String, BlogError> {
        let row = self.query_one(
            "SELECT user_id FROM posts WHERE id = ?1",
            &[Value::text(post_id)],
            || BlogError::not_found("post", post_id),
        )?;
        col(&row, "user_id")
    }

    /// Create a post, its tags, and its optional poll.
    pub fn create_post(&self, who: &Requester, input: CreatePost) -> Result<PostView, BlogError> {
        if is_blank(&input.title) {
            return Err(BlogError::Validation("title can't be empty".into()));
        }
        if is_blank(&input.body) {
            return Err(BlogError::Validation("body can't be empty".into()));
        }
        let poll = input.poll.map(validate_poll).transpose()?;
        let tags = normalize_tags(input.tags);
        let tags_json =
            serde_json::to_string(&tags).map_err(|e| BlogError::Internal(e.to_string()))?;

        self.ensure_user(who)?;
        let id = new_id();
        let now = now_rfc3339();
        self.sql.exec(
            "INSERT INTO posts (id, user_id, title, body, tags, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            &[
                Value::text(&id),
                Value::text(&who.user_id),
                Value::text(input.title.trim()),
                Value::text(input.body),
                Value::text(tags_json),
                Value::text(&now),
            ],
        )?;

        for tag in &tags {
            self.sql.exec(
                "INSERT OR IGNORE INTO tags (id, name, created_at) VALUES (?1, ?2, ?3)",
                &[Value::text(new_id()), Value::text(tag), Value::text(&now)],
            )?;
            self.sql.exec(
                "INSERT OR IGNORE INTO post_tags (post_id, tag_id) \
                 SELECT ?1, id FROM tags WHERE name = ?2",
                &[Value::text(&id), Value::text(tag)],
            )?;
        }
        if let Some(poll) = &poll {
            self.insert_poll(&id, poll)?;
        }

        info!(post_id = %id, user_id = %who.user_id, tags = tags.len(), "created post");
        self.get_post(&id, Some(&who.user_id))
    }

    /// A single post with reaction state and poll results for `viewer`.
    pub fn get_post(&self, id: &str, viewer: Option<&str>) -> Result<PostView, BlogError> {
        let row = self.query_one(
            &format!("SELECT {POST_COLUMNS} FROM {POST_FROM} WHERE p.id = ?1"),
            &[Value::text(id)],
            || BlogError::not_found("post", id),
        )?;
        let post = post_from_row(&row)?;

        let reaction = match viewer {
            Some(me) => self.reaction_of(id, me)?,
            None => None,
        };
        Ok(PostView {
            post,
            liked_by_me: reaction == Some(false),
            disliked_by_me: reaction == Some(true),
            poll: self.poll_view(id, viewer)?,
        })
    }

    /// Posts, newest first by default, optionally by author or tag.
    pub fn list_posts(&self, query: &PostListQuery) -> Result<Page<PostSummary>, BlogError> {
        let mut ks = Keyset::new("posts", "p", POST_COLUMNS, POST_FROM);
        if let Some(user_id) = &query.user_id {
            ks = ks.filter("p.user_id = ?", vec![Value::text(user_id)]);
        }
        if let Some(tag) = &query.tag {
            ks = ks.filter(
                "p.id IN (SELECT pt.post_id FROM post_tags pt JOIN tags t ON t.id = pt.tag_id WHERE t.name = ?)",
                vec![Value::text(tag.trim())],
            );
        }
        self.fetch_page(ks, &query.page(), post_from_row)
    }

    /// Posts written by users the requester follows.
    pub fn following_posts(&self, who: &Requester, page: &PageQuery) -> Result<Page<PostSummary>, BlogError> {
        let ks = Keyset::new("posts", "p", POST_COLUMNS, POST_FROM).filter(
            "p.user_id IN (SELECT following_id FROM follows WHERE follower_id = ?)",
            vec![Value::text(&who.user_id)],
        );
        self.fetch_page(ks, page, post_from_row)
    }

    /// Posts the requester liked, most recent like first. Paged by like id.
    pub fn liked_posts(&self, who: &Requester, page: &PageQuery) -> Result<Page<PostSummary>, BlogError> {
        let ks = Keyset::new("likes", "l", POST_COLUMNS, LIKED_FROM).filter(
            "l.user_id = ? AND l.dislike = 0",
            vec![Value::text(&who.user_id)],
        );
        self.fetch_page(ks, page, post_from_row)
    }

    /// Edit title and/or body. Author only.
    pub fn update_post(&self, who: &Requester, id: &str, input: UpdatePost) -> Result<PostView, BlogError> {
        if input.title.as_deref().is_some_and(is_blank) {
            return Err(BlogError::Validation("title can't be empty".into()));
        }
        if input.body.as_deref().is_some_and(is_blank) {
            return Err(BlogError::Validation("body can't be empty".into()));
        }
        if self.post_owner(id)? != who.user_id {
            return Err(BlogError::not_owner("edit", "post"));
        }

        self.sql.exec(
            "UPDATE posts SET title = COALESCE(?1, title), body = COALESCE(?2, body), updated_at = ?3 \
             WHERE id = ?4",
            &[
                Value::opt_text(input.title.as_deref().map(str::trim)),
                Value::opt_text(input.body.as_deref()),
                Value::text(now_rfc3339()),
                Value::text(id),
            ],
        )?;
        info!(post_id = %id, "updated post");
        self.get_post(id, Some(&who.user_id))
    }

    /// Delete a post with everything hanging off it. Author only.
    pub fn delete_post(&self, who: &Requester, id: &str) -> Result<(), BlogError> {
        if self.post_owner(id)? != who.user_id {
            return Err(BlogError::not_owner("delete", "post"));
        }
        let p = [Value::text(id)];
        let statements = [
            "DELETE FROM notifications WHERE post_id = ?1 \
             OR comment_id IN (SELECT id FROM comments WHERE post_id = ?1)",
            "DELETE FROM comments WHERE post_id = ?1",
            "DELETE FROM likes WHERE post_id = ?1",
            "DELETE FROM votes WHERE poll_id IN (SELECT id FROM polls WHERE post_id = ?1)",
            "DELETE FROM poll_options WHERE poll_id IN (SELECT id FROM polls WHERE post_id = ?1)",
            "DELETE FROM polls WHERE post_id = ?1",
            "DELETE FROM post_tags WHERE post_id = ?1",
            "DELETE FROM posts WHERE id = ?1",
        ];
        for stmt in statements {
            self.sql.exec(stmt, &p)?;
        }
        info!(post_id = %id, user_id = %who.user_id, "deleted post");
        Ok(())
    }

    /// `Some(dislike)` if `user_id` reacted to the post.
    fn reaction_of(&self, post_id: &str, user_id: &str) -> Result<Option<bool>, BlogError> {
        let rows = self.sql.query(
            "SELECT dislike FROM likes WHERE post_id = ?1 AND user_id = ?2",
            &[Value::text(post_id), Value::text(user_id)],
        )?;
        Ok(rows.first().and_then(|r| r.get_bool("dislike")))
    }

    /// At most one `Like` notification per actor and post, however often
    /// the like is toggled.
    fn notify_like(&self, owner: &str, actor: &str, post_id: &str) -> Result<(), BlogError> {
        let seen = self.exists(
            "SELECT 1 FROM notifications WHERE user_id = ?1 AND actor_id = ?2 AND post_id = ?3 AND kind = ?4",
            &[
                Value::text(owner),
                Value::text(actor),
                Value::text(post_id),
                Value::text(NotificationKind::Like.as_str()),
            ],
        )?;
        if seen {
            return Ok(());
        }
        self.notify(owner, actor, NotificationKind::Like, Some(post_id), None)
    }

    /// Toggle a like (or dislike). Repeating the same reaction removes it;
    /// the opposite reaction replaces it.
    pub fn like_post(&self, who: &Requester, post_id: &str, dislike: bool) -> Result<LikeState, BlogError> {
        let owner = self.post_owner(post_id)?;
        self.ensure_user(who)?;

        match self.reaction_of(post_id, &who.user_id)? {
            Some(prev) if prev == dislike => {
                self.sql.exec(
                    "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2",
                    &[Value::text(post_id), Value::text(&who.user_id)],
                )?;
            }
            Some(_) => {
                self.sql.exec(
                    "UPDATE likes SET dislike = ?1 WHERE post_id = ?2 AND user_id = ?3",
                    &[Value::bool(dislike), Value::text(post_id), Value::text(&who.user_id)],
                )?;
                if !dislike {
                    self.notify_like(&owner, &who.user_id, post_id)?;
                }
            }
            None => {
                self.sql.exec(
                    "INSERT INTO likes (id, post_id, user_id, dislike, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                    &[
                        Value::text(new_id()),
                        Value::text(post_id),
                        Value::text(&who.user_id),
                        Value::bool(dislike),
                        Value::text(now_rfc3339()),
                    ],
                )?;
                if !dislike {
                    self.notify_like(&owner, &who.user_id, post_id)?;
                }
            }
        }

        let reaction = self.reaction_of(post_id, &who.user_id)?;
        let row = self.query_one(
            "SELECT \
                (SELECT COUNT(*) FROM likes WHERE post_id = ?1 AND dislike = 0) AS likes, \
                (SELECT COUNT(*) FROM likes WHERE post_id = ?1 AND dislike = 1) AS dislikes",
            &[Value::text(post_id)],
            || BlogError::not_found("post", post_id),
        )?;
        Ok(LikeState {
            likes: int(&row, "likes"),
            dislikes: int(&row, "dislikes"),
            liked_by_me: reaction == Some(false),
            disliked_by_me: reaction == Some(true),
        })
    }
}
