//! Cursor pagination types shared by every list endpoint.
//!
//! A request carries `limit` and an optional `cursor`. The store is asked for
//! `limit + 1` rows; if the extra row comes back it is dropped from the page
//! and its id becomes `next_cursor`. The following request starts *at* that
//! row, so the cursor always names the first item the client has not seen.

use serde::{Deserialize, Serialize};

use crate::ServiceError;

/// Page size used when the client does not send `limit`.
pub const DEFAULT_LIMIT: usize = 10;

/// Largest page a client may ask for.
pub const MAX_LIMIT: usize = 100;

/// Direction of the (created_at, id) ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl SortOrder {
    pub fn is_descending(&self) -> bool {
        matches!(self, SortOrder::Newest)
    }
}

/// Pagination input for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: usize,
    pub cursor: Option<String>,
    pub sort: SortOrder,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            cursor: None,
            sort: SortOrder::Newest,
        }
    }
}

impl PageQuery {
    /// Build from raw query-string values, applying the defaults.
    pub fn new(limit: Option<usize>, cursor: Option<String>, sort: Option<SortOrder>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_LIMIT),
            cursor: cursor.filter(|c| !c.is_empty()),
            sort: sort.unwrap_or_default(),
        }
    }

    pub fn first(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    /// Same query, positioned at `cursor`.
    pub fn at(&self, cursor: impl Into<String>) -> Self {
        Self {
            cursor: Some(cursor.into()),
            ..self.clone()
        }
    }

    /// Reject limits outside `1..=MAX_LIMIT`.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.limit == 0 || self.limit > MAX_LIMIT {
            return Err(ServiceError::Validation(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        Ok(())
    }

    /// Number of rows to request from the store.
    pub fn fetch_size(&self) -> usize {
        self.limit + 1
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T: Serialize> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T: Serialize> Page<T> {
    /// Trim an over-fetched result into a page.
    ///
    /// `rows` pairs each item with its cursor id and must hold at most
    /// `limit + 1` entries, in page order.
    pub fn from_overfetch(mut rows: Vec<(String, T)>, limit: usize) -> Self {
        let next_cursor = if rows.len() > limit {
            rows.truncate(limit + 1);
            rows.pop().map(|(id, _)| id)
        } else {
            None
        };
        Self {
            items: rows.into_iter().map(|(_, item)| item).collect(),
            next_cursor,
        }
    }

    pub fn map<U: Serialize>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_cursor: self.next_cursor,
        }
    }
}
