use tracing::info;

use blog_core::{Requester, is_blank, now_rfc3339};
use blog_sql::{Row, Value};

use crate::model::{UpdateProfile, User, UserProfile, UserSummary};
use crate::service::{BlogError, BlogService, col};

/// Trimmed value, with blank meaning "clear the field".
fn optional(field: Option<String>) -> Option<Option<String>> {
    field.map(|v| {
        let v = v.trim().to_string();
        if v.is_empty() { None } else { Some(v) }
    })
}

fn user_from_row(row: &Row) -> Result<User, BlogError> {
    Ok(User {
        id: col(row, "id")?,
        name: col(row, "name")?,
        email: row.get_string("email"),
        image: row.get_string("image"),
        bio: row.get_string("bio"),
        created_at: col(row, "created_at")?,
        updated_at: col(row, "updated_at")?,
    })
}

impl BlogService {
    /// Create or edit the requester's own profile.
    pub fn upsert_profile(&self, who: &Requester, input: UpdateProfile) -> Result<User, BlogError> {
        if input.name.as_deref().is_some_and(is_blank) {
            return Err(BlogError::Validation("name can't be empty".into()));
        }
        self.ensure_user(who)?;

        let current = self.get_user(&who.user_id)?;
        let email = optional(input.email).unwrap_or(current.email);
        let image = optional(input.image).unwrap_or(current.image);
        let bio = optional(input.bio).unwrap_or(current.bio);
        let name = input
            .name
            .map(|n| n.trim().to_string())
            .unwrap_or(current.name);

        self.sql.exec(
            "UPDATE users SET name = ?1, email = ?2, image = ?3, bio = ?4, updated_at = ?5 WHERE id = ?6",
            &[
                Value::text(name),
                Value::opt_text(email.as_deref()),
                Value::opt_text(image.as_deref()),
                Value::opt_text(bio.as_deref()),
                Value::text(now_rfc3339()),
                Value::text(&who.user_id),
            ],
        )?;
        info!(user_id = %who.user_id, "updated profile");
        self.get_user(&who.user_id)
    }

    pub fn get_user(&self, id: &str) -> Result<User, BlogError> {
        let row = self.query_one(
            "SELECT id, name, email, image, bio, created_at, updated_at FROM users WHERE id = ?1",
            &[Value::text(id)],
            || BlogError::not_found("user", id),
        )?;
        user_from_row(&row)
    }

    pub(crate) fn user_summary_of(&self, id: &str) -> Result<UserSummary, BlogError> {
        let user = self.get_user(id)?;
        Ok(UserSummary {
            id: user.id,
            name: user.name,
            image: user.image,
        })
    }

    /// Public profile with follow counts, personalised for `viewer`.
    pub fn get_profile(&self, id: &str, viewer: Option<&str>) -> Result<UserProfile, BlogError> {
        let user = self.get_user(id)?;
        let followers = self.count(
            "SELECT COUNT(*) AS n FROM follows WHERE following_id = ?1",
            &[Value::text(id)],
        )?;
        let following = self.count(
            "SELECT COUNT(*) AS n FROM follows WHERE follower_id = ?1",
            &[Value::text(id)],
        )?;
        let followed_by_me = match viewer {
            Some(me) => self.is_following(me, id)?,
            None => false,
        };
        Ok(UserProfile {
            user,
            followers,
            following,
            followed_by_me,
        })
    }
}
