//! Keyset pagination over `(created_at, id)`.
//!
//! A list query is described by a [`Keyset`]: the table whose rows are being
//! paged, the alias it has in `FROM`, the selected columns and any filters.
//! [`BlogService::fetch_page`] adds the cursor condition and ordering, asks
//! for one row more than the page size, and hands the rows to
//! [`Page::from_overfetch`].
//!
//! With rows ordered by `(created_at, id)` descending, the page starting at
//! cursor row `c` is every row with
//! `created_at < c.created_at OR (created_at = c.created_at AND id <= c.id)`.
//! Ascending order flips both comparisons.

use serde::Serialize;
use tracing::debug;

use blog_core::{Page, PageQuery};
use blog_sql::{Row, Value};

use crate::service::{BlogError, BlogService, col};

/// Description of one paged list query.
pub(crate) struct Keyset {
    table: &'static str,
    alias: &'static str,
    columns: &'static str,
    from: &'static str,
    filters: Vec<String>,
    params: Vec<Value>,
}

impl Keyset {
    /// `table` is the paged table, reachable in `from` as `alias`. Its
    /// `id` is the cursor and its `created_at` the sort key.
    pub(crate) fn new(
        table: &'static str,
        alias: &'static str,
        columns: &'static str,
        from: &'static str,
    ) -> Self {
        Self {
            table,
            alias,
            columns,
            from,
            filters: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Add a `WHERE` conjunct using anonymous `?` placeholders.
    pub(crate) fn filter(mut self, cond: impl Into<String>, params: Vec<Value>) -> Self {
        self.filters.push(cond.into());
        self.params.extend(params);
        self
    }
}

impl BlogService {
    /// Fetch one page of `keyset`, mapping each row with `map`.
    pub(crate) fn fetch_page<T, F>(
        &self,
        keyset: Keyset,
        page: &PageQuery,
        map: F,
    ) -> Result<Page<T>, BlogError>
    where
        T: Serialize,
        F: Fn(&Row) -> Result<T, BlogError>,
    {
        page.validate()
            .map_err(|e| BlogError::Validation(e.to_string()))?;

        let Keyset {
            table,
            alias,
            columns,
            from,
            mut filters,
            mut params,
        } = keyset;
        let desc = page.sort.is_descending();

        if let Some(cursor) = &page.cursor {
            let rows = self.sql.query(
                &format!("SELECT created_at FROM {table} WHERE id = ?"),
                &[Value::text(cursor)],
            )?;
            let anchor = rows
                .first()
                .ok_or_else(|| BlogError::Validation(format!("unknown cursor: {cursor}")))?;
            let created_at = col(anchor, "created_at")?;

            let (past, at) = if desc { ("<", "<=") } else { (">", ">=") };
            filters.push(format!(
                "({alias}.created_at {past} ? OR ({alias}.created_at = ? AND {alias}.id {at} ?))"
            ));
            params.push(Value::text(&created_at));
            params.push(Value::text(created_at));
            params.push(Value::text(cursor));
        }

        let where_sql = if filters.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", filters.join(" AND "))
        };
        let dir = if desc { "DESC" } else { "ASC" };
        let sql = format!(
            "SELECT {alias}.id AS cursor_id, {columns} FROM {from}{where_sql} \
             ORDER BY {alias}.created_at {dir}, {alias}.id {dir} LIMIT {}",
            page.fetch_size(),
        );

        let rows = self.sql.query(&sql, &params)?;
        debug!(
            table,
            limit = page.limit,
            cursor = page.cursor.as_deref().unwrap_or(""),
            fetched = rows.len(),
            "fetched page"
        );

        let mut items = Vec::with_capacity(rows.len());
        for row in &rows {
            items.push((col(row, "cursor_id")?, map(row)?));
        }
        Ok(Page::from_overfetch(items, page.limit))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use blog_core::SortOrder;

    use super::*;
    use crate::service::testutil::service;

    /// Users `u0..u{n}`; every pair shares a timestamp so the id tie-break
    /// is exercised.
    fn seeded(n: usize) -> std::sync::Arc<BlogService> {
        let svc = service();
        for i in 0..n {
            let ts = format!("2024-01-01T00:00:{:02}.000000Z", i / 2);
            svc.sql
                .exec(
                    "INSERT INTO users (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                    &[Value::text(format!("u{i}")), Value::text(format!("User {i}")), Value::text(ts)],
                )
                .unwrap();
        }
        svc
    }

    fn users() -> Keyset {
        Keyset::new("users", "u", "u.name AS name", "users u")
    }

    fn names(svc: &BlogService, q: &PageQuery) -> Page<String> {
        svc.fetch_page(users(), q, |r| col(r, "name")).unwrap()
    }

    #[test]
    fn seven_records_limit_five() {
        let svc = seeded(7);
        let first = names(&svc, &PageQuery::first(5));
        assert_eq!(first.items.len(), 5);
        let cursor = first.next_cursor.clone().unwrap();

        let second = names(&svc, &PageQuery::first(5).at(cursor));
        assert_eq!(second.items.len(), 2);
        assert!(second.next_cursor.is_none());
    }

    #[test]
    fn pages_never_skip_or_repeat() {
        let svc = seeded(23);
        for sort in [SortOrder::Newest, SortOrder::Oldest] {
            let mut q = PageQuery { limit: 4, cursor: None, sort };
            let mut seen = Vec::new();
            loop {
                let page = names(&svc, &q);
                seen.extend(page.items);
                match page.next_cursor {
                    Some(c) => q = q.at(c),
                    None => break,
                }
            }
            assert_eq!(seen.len(), 23);
            let unique: HashSet<_> = seen.iter().collect();
            assert_eq!(unique.len(), 23);
        }
    }

    #[test]
    fn newest_and_oldest_orders() {
        let svc = seeded(4);
        let newest = names(&svc, &PageQuery::first(10));
        assert_eq!(newest.items, vec!["User 3", "User 2", "User 1", "User 0"]);

        let oldest = names(
            &svc,
            &PageQuery { limit: 10, cursor: None, sort: SortOrder::Oldest },
        );
        assert_eq!(oldest.items, vec!["User 0", "User 1", "User 2", "User 3"]);
    }

    #[test]
    fn cursor_row_starts_the_page() {
        let svc = seeded(5);
        let first = names(&svc, &PageQuery::first(2));
        assert_eq!(first.next_cursor.as_deref(), Some("u2"));
        let second = names(&svc, &PageQuery::first(2).at("u2"));
        assert_eq!(second.items[0], "User 2");
    }

    #[test]
    fn filters_apply() {
        let svc = seeded(6);
        let ks = users().filter("u.id <> ?", vec![Value::text("u5")]);
        let page = svc
            .fetch_page(ks, &PageQuery::first(10), |r| col(r, "name"))
            .unwrap();
        assert_eq!(page.items.len(), 5);
        assert!(!page.items.contains(&"User 5".to_string()));
    }

    #[test]
    fn unknown_cursor_is_validation() {
        let svc = seeded(3);
        let err = svc
            .fetch_page(users(), &PageQuery::first(2).at("nope"), |r| col(r, "name"))
            .unwrap_err();
        assert!(matches!(err, BlogError::Validation(_)));
    }

    #[test]
    fn bad_limit_is_validation() {
        let svc = seeded(1);
        for limit in [0, 101] {
            let err = svc
                .fetch_page(users(), &PageQuery::first(limit), |r| col(r, "name"))
                .unwrap_err();
            assert!(matches!(err, BlogError::Validation(_)));
        }
    }

    #[test]
    fn empty_table_is_empty_page() {
        let svc = service();
        let page = names(&svc, &PageQuery::default());
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }
}
