use tracing::info;

use blog_core::{Requester, is_blank, new_id, now_rfc3339};
use blog_sql::Value;

use crate::model::{CreatePoll, PollOptionView, PollView};
use crate::service::{BlogError, BlogService, col, int};

/// Trimmed poll input; a poll needs a title and at least two options.
pub(crate) fn validate_poll(input: CreatePoll) -> Result<CreatePoll, BlogError> {
    if is_blank(&input.title) {
        return Err(BlogError::Validation("poll title can't be empty".into()));
    }
    let options: Vec<String> = input
        .options
        .iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect();
    if options.len() < 2 {
        return Err(BlogError::Validation(
            "a poll needs at least two options".into(),
        ));
    }
    Ok(CreatePoll {
        title: input.title.trim().to_string(),
        options,
    })
}

impl BlogService {
    pub(crate) fn insert_poll(&self, post_id: &str, poll: &CreatePoll) -> Result<(), BlogError> {
        let poll_id = new_id();
        self.sql.exec(
            "INSERT INTO polls (id, post_id, title, created_at) VALUES (?1, ?2, ?3, ?4)",
            &[
                Value::text(&poll_id),
                Value::text(post_id),
                Value::text(&poll.title),
                Value::text(now_rfc3339()),
            ],
        )?;
        for (position, title) in poll.options.iter().enumerate() {
            self.sql.exec(
                "INSERT INTO poll_options (id, poll_id, title, position) VALUES (?1, ?2, ?3, ?4)",
                &[
                    Value::text(new_id()),
                    Value::text(&poll_id),
                    Value::text(title),
                    Value::Integer(position as i64),
                ],
            )?;
        }
        Ok(())
    }

    /// Poll results for a post, or `None` if the post has no poll.
    pub fn poll_view(&self, post_id: &str, viewer: Option<&str>) -> Result<Option<PollView>, BlogError> {
        let polls = self.sql.query(
            "SELECT id, title FROM polls WHERE post_id = ?1",
            &[Value::text(post_id)],
        )?;
        let Some(poll) = polls.first() else {
            return Ok(None);
        };
        let poll_id = col(poll, "id")?;
        let me = Value::opt_text(viewer);

        let rows = self.sql.query(
            "SELECT o.id AS id, o.title AS title, \
                (SELECT COUNT(*) FROM votes v WHERE v.option_id = o.id) AS votes, \
                EXISTS (SELECT 1 FROM votes v WHERE v.option_id = o.id AND v.user_id = ?2) AS mine \
             FROM poll_options o WHERE o.poll_id = ?1 ORDER BY o.position",
            &[Value::text(&poll_id), me],
        )?;

        let mut options = Vec::with_capacity(rows.len());
        for row in &rows {
            options.push(PollOptionView {
                id: col(row, "id")?,
                title: col(row, "title")?,
                votes: int(row, "votes"),
                voted_by_me: row.get_bool("mine").unwrap_or(false),
            });
        }
        Ok(Some(PollView {
            id: poll_id,
            title: col(poll, "title")?,
            voters: options.iter().map(|o| o.votes).sum(),
            already_voted: options.iter().any(|o| o.voted_by_me),
            options,
        }))
    }

    /// Cast the requester's single vote on the post's poll.
    pub fn vote(&self, who: &Requester, post_id: &str, option_id: &str) -> Result<PollView, BlogError> {
        self.post_owner(post_id)?;
        let poll = self.query_one(
            "SELECT id FROM polls WHERE post_id = ?1",
            &[Value::text(post_id)],
            || BlogError::NotFound(format!("post {post_id} has no poll")),
        )?;
        let poll_id = col(&poll, "id")?;

        let belongs = self.exists(
            "SELECT 1 FROM poll_options WHERE id = ?1 AND poll_id = ?2",
            &[Value::text(option_id), Value::text(&poll_id)],
        )?;
        if !belongs {
            return Err(BlogError::Validation(format!(
                "option {option_id} is not part of this poll"
            )));
        }

        self.ensure_user(who)?;
        self.sql
            .exec(
                "INSERT INTO votes (id, poll_id, option_id, user_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                &[
                    Value::text(new_id()),
                    Value::text(&poll_id),
                    Value::text(option_id),
                    Value::text(&who.user_id),
                    Value::text(now_rfc3339()),
                ],
            )
            .map_err(|e| {
                if e.is_constraint() {
                    BlogError::Conflict("you already voted on this poll".into())
                } else {
                    e.into()
                }
            })?;
        info!(post_id, user_id = %who.user_id, "vote cast");

        self.poll_view(post_id, Some(&who.user_id))?
            .ok_or_else(|| BlogError::Internal("poll vanished after vote".into()))
    }
}
