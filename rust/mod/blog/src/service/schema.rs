use blog_sql::SQLStore;

use crate::service::BlogError;

/// Initialize the SQLite schema for all blog resources.
///
/// Every `created_at` column that drives a list has a composite
/// `(…, created_at, id)` index so keyset pages are index scans.
pub fn init_schema(sql: &dyn SQLStore) -> Result<(), BlogError> {
    let statements = [
        // Users: profile data keyed by token subject
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT,
            image TEXT,
            bio TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_users_created ON users(created_at, id)",

        // Posts: tags denormalised as a JSON array for reads
        "CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_posts_created ON posts(created_at, id)",
        "CREATE INDEX IF NOT EXISTS idx_posts_user ON posts(user_id, created_at, id)",

        // Tags and the post/tag join
        "CREATE TABLE IF NOT EXISTS tags (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS post_tags (
            post_id TEXT NOT NULL,
            tag_id TEXT NOT NULL,
            PRIMARY KEY (post_id, tag_id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_post_tags_tag ON post_tags(tag_id)",

        // Likes: one reaction per user per post
        "CREATE TABLE IF NOT EXISTS likes (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            dislike INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            UNIQUE (post_id, user_id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_likes_user ON likes(user_id, created_at, id)",

        // Polls: at most one per post, options kept in input order
        "CREATE TABLE IF NOT EXISTS polls (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS poll_options (
            id TEXT PRIMARY KEY,
            poll_id TEXT NOT NULL,
            title TEXT NOT NULL,
            position INTEGER NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_poll_options_poll ON poll_options(poll_id, position)",
        "CREATE TABLE IF NOT EXISTS votes (
            id TEXT PRIMARY KEY,
            poll_id TEXT NOT NULL,
            option_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (poll_id, user_id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_votes_option ON votes(option_id)",

        // Comments: parent_id drives the thread and the cascade
        "CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL,
            parent_id TEXT,
            user_id TEXT NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_comments_post ON comments(post_id, created_at, id)",
        "CREATE INDEX IF NOT EXISTS idx_comments_parent ON comments(parent_id)",
        "CREATE INDEX IF NOT EXISTS idx_comments_user ON comments(user_id, created_at, id)",

        // Follows: directed, unique, never reflexive
        "CREATE TABLE IF NOT EXISTS follows (
            id TEXT PRIMARY KEY,
            follower_id TEXT NOT NULL,
            following_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (follower_id, following_id),
            CHECK (follower_id <> following_id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_follows_following ON follows(following_id, created_at, id)",

        // Notifications: per recipient, with a read flag
        "CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            actor_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            post_id TEXT,
            comment_id TEXT,
            read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, read, created_at, id)",
        "CREATE INDEX IF NOT EXISTS idx_notifications_comment ON notifications(comment_id)",
        "CREATE INDEX IF NOT EXISTS idx_notifications_post ON notifications(post_id)",
    ];

    for stmt in statements {
        sql.exec(stmt, &[])?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use blog_sql::SqliteStore;

    #[test]
    fn init_is_repeatable() {
        let sql = SqliteStore::open_in_memory().unwrap();
        init_schema(&sql).unwrap();
        init_schema(&sql).unwrap();
        let rows = sql
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
                &[],
            )
            .unwrap();
        let names: Vec<&str> = rows.iter().filter_map(|r| r.get_str("name")).collect();
        for table in ["comments", "follows", "likes", "notifications", "posts", "users", "votes"] {
            assert!(names.contains(&table), "missing {table}");
        }
    }
}
