//! SQLite schema for the embedded-database backend
//!
//! `posts` is keyed by slug with tags serialized as a JSON array column.
//! Timestamps are stored as fixed-width RFC 3339 UTC text (nanosecond
//! precision) so that text order equals time order.

use rusqlite::{Connection, Result};

/// Current schema version for migrations
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Schema version tracking
        CREATE TABLE IF NOT EXISTS schema_info (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS posts (
            slug TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            summary TEXT NOT NULL DEFAULT '',
            content TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            tags TEXT NOT NULL DEFAULT '[]',
            cover_image TEXT NOT NULL DEFAULT '',
            featured BOOLEAN NOT NULL DEFAULT 0,
            is_draft BOOLEAN NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        -- Newest-first listings
        CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at DESC);

        CREATE TABLE IF NOT EXISTS subscribers (
            email TEXT PRIMARY KEY,
            active BOOLEAN NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO schema_info (key, value) VALUES ('version', ?)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<Option<i32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_info WHERE key = 'version'")?;
    let result: Result<String> = stmt.query_row([], |row| row.get(0));

    match result {
        Ok(version_str) => Ok(version_str.parse().ok()),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e),
    }
}

fn table_exists(conn: &Connection, name: &str) -> bool {
    conn.prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name=?")
        .and_then(|mut stmt| stmt.exists([name]))
        .unwrap_or(false)
}

/// Whether the database holds a `posts` table this schema did not create
pub fn has_unversioned_posts(conn: &Connection) -> bool {
    table_exists(conn, "posts") && !table_exists(conn, "schema_info")
}

/// Check if schema needs initialization or migration
pub fn needs_init(conn: &Connection) -> bool {
    if !table_exists(conn, "schema_info") {
        return true;
    }

    match get_schema_version(conn) {
        Ok(Some(v)) => v < SCHEMA_VERSION,
        _ => true,
    }
}
