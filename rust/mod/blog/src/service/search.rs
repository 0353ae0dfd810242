//! Substring search over one content type at a time.
//!
//! Matching is SQLite `LIKE` (ASCII case-insensitive) with the user's text
//! escaped, so `%` and `_` are literal. Results page like every other list.

use tracing::debug;

use blog_core::Page;
use blog_sql::{Row, Value};

use crate::model::{SearchHit, SearchQuery, SearchType, TagView};
use crate::service::comment::{COMMENT_COLUMNS, COMMENT_FROM, comment_from_row};
use crate::service::keyset::Keyset;
use crate::service::post::{POST_COLUMNS, POST_FROM, post_from_row};
use crate::service::{BlogError, BlogService, col, int, user_summary};

const USER_COLUMNS: &str = "u.id AS author_id, u.name AS author_name, u.image AS author_image";

const TAG_COLUMNS: &str = "t.id AS id, t.name AS name, \
     (SELECT COUNT(*) FROM post_tags pt WHERE pt.tag_id = t.id) AS posts";

/// `%text%` with LIKE metacharacters escaped by `\`.
fn contains_pattern(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('%');
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('%');
    out
}

fn tag_from_row(row: &Row) -> Result<TagView, BlogError> {
    Ok(TagView {
        id: col(row, "id")?,
        name: col(row, "name")?,
        posts: int(row, "posts"),
    })
}

impl BlogService {
    pub fn search(&self, query: &SearchQuery) -> Result<Page<SearchHit>, BlogError> {
        let text = query.q.trim();
        if text.is_empty() {
            return Err(BlogError::Validation("search query can't be empty".into()));
        }
        let pattern = contains_pattern(text);
        let page = query.page();
        debug!(q = text, kind = ?query.search_type, "search");

        match query.search_type {
            SearchType::Posts => {
                let ks = Keyset::new("posts", "p", POST_COLUMNS, POST_FROM).filter(
                    "(p.title LIKE ? ESCAPE '\\' OR p.body LIKE ? ESCAPE '\\')",
                    vec![Value::text(&pattern), Value::text(&pattern)],
                );
                self.fetch_page(ks, &page, |r| post_from_row(r).map(SearchHit::Post))
            }
            SearchType::Comments => {
                let ks = Keyset::new("comments", "c", COMMENT_COLUMNS, COMMENT_FROM)
                    .filter("c.body LIKE ? ESCAPE '\\'", vec![Value::text(&pattern)]);
                self.fetch_page(ks, &page, |r| comment_from_row(r).map(SearchHit::Comment))
            }
            SearchType::Users => {
                let ks = Keyset::new("users", "u", USER_COLUMNS, "users u")
                    .filter("u.name LIKE ? ESCAPE '\\'", vec![Value::text(&pattern)]);
                self.fetch_page(ks, &page, |r| user_summary(r, "author").map(SearchHit::User))
            }
            SearchType::Tags => {
                let ks = Keyset::new("tags", "t", TAG_COLUMNS, "tags t")
                    .filter("t.name LIKE ? ESCAPE '\\'", vec![Value::text(&pattern)]);
                self.fetch_page(ks, &page, |r| tag_from_row(r).map(SearchHit::Tag))
            }
        }
    }
}
