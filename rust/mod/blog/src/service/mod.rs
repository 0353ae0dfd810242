pub mod comment;
pub mod follow;
pub mod keyset;
pub mod notification;
pub mod poll;
pub mod post;
pub mod schema;
pub mod search;
pub mod user;

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use blog_core::{Requester, ServiceError, now_rfc3339};
use blog_sql::{Row, SQLError, SQLStore, Value};

use crate::model::UserSummary;

/// Blog service error type.
#[derive(Debug, Error)]
pub enum BlogError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Storage(String),

    #[error("{0}")]
    Internal(String),
}

impl BlogError {
    /// `{what} {id} not found`.
    pub(crate) fn not_found(what: &str, id: &str) -> Self {
        BlogError::NotFound(format!("{what} {id} not found"))
    }

    /// `cannot {action} another user's {what}`.
    pub(crate) fn not_owner(action: &str, what: &str) -> Self {
        BlogError::Forbidden(format!("cannot {action} another user's {what}"))
    }
}

impl From<BlogError> for ServiceError {
    fn from(e: BlogError) -> Self {
        match e {
            BlogError::NotFound(m) => ServiceError::NotFound(m),
            BlogError::Conflict(m) => ServiceError::Conflict(m),
            BlogError::Validation(m) => ServiceError::Validation(m),
            BlogError::Forbidden(m) => ServiceError::PermissionDenied(m),
            BlogError::Storage(m) => ServiceError::Storage(m),
            BlogError::Internal(m) => ServiceError::Internal(m),
        }
    }
}

impl From<SQLError> for BlogError {
    fn from(e: SQLError) -> Self {
        if e.is_constraint() {
            BlogError::Conflict(e.to_string())
        } else {
            BlogError::Storage(e.to_string())
        }
    }
}

/// The blog service. Holds the SQL store; every operation is a
/// request-scoped sequence of statements against it.
pub struct BlogService {
    pub(crate) sql: Arc<dyn SQLStore>,
}

impl BlogService {
    /// Create a new BlogService, initializing the DB schema.
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Arc<Self>, BlogError> {
        schema::init_schema(sql.as_ref())?;
        Ok(Arc::new(Self { sql }))
    }

    /// Make sure the requester has a user row so joins on `users` find them.
    ///
    /// Identity is owned by the token issuer; the first write creates the
    /// profile from the token's display name.
    pub(crate) fn ensure_user(&self, who: &Requester) -> Result<(), BlogError> {
        let now = now_rfc3339();
        let created = self.sql.exec(
            "INSERT OR IGNORE INTO users (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
            &[Value::text(&who.user_id), Value::text(&who.name), Value::text(now)],
        )?;
        if created > 0 {
            debug!(user_id = %who.user_id, "created user profile from token");
        }
        Ok(())
    }

    /// Single-row lookup, `NotFound` with `what` when nothing matches.
    pub(crate) fn query_one(
        &self,
        sql: &str,
        params: &[Value],
        missing: impl FnOnce() -> BlogError,
    ) -> Result<Row, BlogError> {
        self.sql
            .query(sql, params)?
            .into_iter()
            .next()
            .ok_or_else(missing)
    }

    /// `SELECT COUNT(*) AS n ...` helper.
    pub(crate) fn count(&self, sql: &str, params: &[Value]) -> Result<i64, BlogError> {
        let rows = self.sql.query(sql, params)?;
        Ok(rows.first().and_then(|r| r.get_i64("n")).unwrap_or(0))
    }

    pub(crate) fn exists(&self, sql: &str, params: &[Value]) -> Result<bool, BlogError> {
        Ok(!self.sql.query(sql, params)?.is_empty())
    }
}

/// Required text column.
pub(crate) fn col(row: &Row, name: &str) -> Result<String, BlogError> {
    row.get_string(name)
        .ok_or_else(|| BlogError::Internal(format!("missing column {name}")))
}

/// Integer column, NULL reads as 0 (aggregates over empty sets).
pub(crate) fn int(row: &Row, name: &str) -> i64 {
    row.get_i64(name).unwrap_or(0)
}

/// Author block from `{prefix}_id`, `{prefix}_name`, `{prefix}_image` columns.
pub(crate) fn user_summary(row: &Row, prefix: &str) -> Result<UserSummary, BlogError> {
    Ok(UserSummary {
        id: col(row, &format!("{prefix}_id"))?,
        name: col(row, &format!("{prefix}_name"))?,
        image: row.get_string(&format!("{prefix}_image")),
    })
}

/// `?, ?, ?` for `n` parameters.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}
