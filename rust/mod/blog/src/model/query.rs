//! Query-string shapes for list endpoints.
//!
//! Each endpoint spells out its own pagination fields instead of flattening
//! a shared struct: `serde(flatten)` does not parse numbers out of
//! urlencoded query strings.

use blog_core::{PageQuery, SortOrder};
use serde::Deserialize;

use super::search::SearchType;

/// `?limit=&cursor=&sort=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
}

impl ListQuery {
    pub fn page(&self) -> PageQuery {
        PageQuery::new(self.limit, self.cursor.clone(), self.sort)
    }
}

/// `GET /posts` filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostListQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub sort: Option<SortOrder>,
    /// Only posts by this author.
    #[serde(default)]
    pub user_id: Option<String>,
    /// Only posts carrying this tag.
    #[serde(default)]
    pub tag: Option<String>,
}

impl PostListQuery {
    pub fn page(&self) -> PageQuery {
        PageQuery::new(self.limit, self.cursor.clone(), self.sort)
    }
}

/// `GET /notifications` filters. `read` absent lists both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub read: Option<bool>,
}

impl NotificationQuery {
    pub fn page(&self) -> PageQuery {
        PageQuery::new(self.limit, self.cursor.clone(), None)
    }
}

/// `GET /search?q=&type=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    #[serde(default, rename = "type")]
    pub search_type: SearchType,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub cursor: Option<String>,
}

impl SearchQuery {
    pub fn page(&self) -> PageQuery {
        PageQuery::new(self.limit, self.cursor.clone(), None)
    }
}
