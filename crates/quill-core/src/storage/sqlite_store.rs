//! SQLite post store
//!
//! Backs the post contract with a `posts` table keyed by slug. Connections
//! come from an r2d2 pool; each one runs in WAL mode with a busy timeout, so
//! concurrent readers and a single writer wait on the engine's locks rather
//! than failing. There is no application-level lock on top.
//!
//! Mutations run in `IMMEDIATE` transactions: the write lock is taken before
//! the uniqueness checks, so check-then-write cannot race another writer.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Params, Row, TransactionBehavior};
use tracing::{debug, info, warn};

use crate::models::{Post, Subscriber};
use crate::query::{page_offset, rank_related};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::schema::{has_unversioned_posts, init_schema, needs_init};
use crate::store::{PostStore, StoreError, StoreResult};

/// How long a connection waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Maximum pooled connections
const POOL_SIZE: u32 = 8;

const POST_COLUMNS: &str = "slug, title, summary, content, category, tags, cover_image, \
                            featured, is_draft, created_at, updated_at";

const LISTING_ORDER: &str = "ORDER BY created_at DESC, slug ASC";

/// Post store backed by an embedded SQLite database
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl SqliteStore {
    /// Open or create the database at `path`
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let manager = SqliteConnectionManager::file(&path).with_init(configure_connection);
        let pool = Pool::builder()
            .max_size(POOL_SIZE)
            .min_idle(Some(1))
            .build(manager)?;

        {
            let conn = pool.get()?;
            if has_unversioned_posts(&conn) {
                return Err(StorageError::InvalidFormat {
                    path,
                    details: "existing posts table without a schema version; \
                              import its posts from JSON into a fresh database instead"
                        .to_string(),
                }
                .into());
            }
            if needs_init(&conn) {
                init_schema(&conn)?;
                info!("Initialized SQLite schema at {:?}", path);
            }
        }

        Ok(Self { pool, path })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> StoreResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    // ==================== Subscriber Operations ====================

    /// Subscribe `email`, reactivating it if it was unsubscribed
    pub fn add_subscriber(&self, email: &str) -> StoreResult<()> {
        if email.is_empty() {
            return Err(StoreError::InvalidInput(
                "subscriber email is required".to_string(),
            ));
        }

        self.conn()?.execute(
            r#"
            INSERT INTO subscribers (email, active, created_at)
            VALUES (?1, 1, ?2)
            ON CONFLICT(email) DO UPDATE SET active = 1
            "#,
            params![email, format_timestamp(&Utc::now())],
        )?;
        Ok(())
    }

    /// Soft-delete: the row stays, marked inactive
    pub fn remove_subscriber(&self, email: &str) -> StoreResult<()> {
        let changed = self.conn()?.execute(
            "UPDATE subscribers SET active = 0 WHERE email = ?",
            params![email],
        )?;
        if changed == 0 {
            debug!("No subscriber {} to remove", email);
        }
        Ok(())
    }

    /// Active subscribers, newest first
    pub fn list_subscribers(&self) -> StoreResult<Vec<Subscriber>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT email, active, created_at FROM subscribers \
             WHERE active = 1 ORDER BY created_at DESC, email ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, bool>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(email, active, created_at)| -> StoreResult<Subscriber> {
                Ok(Subscriber {
                    email,
                    active,
                    created_at: self.parse_timestamp(&created_at)?,
                })
            })
            .collect()
    }

    // ==================== Private helpers ====================

    fn query_posts<P: Params>(&self, conn: &Connection, sql: &str, params: P) -> StoreResult<Vec<Post>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, read_post_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(|row| self.hydrate_post(row)).collect()
    }

    fn paginate_where(
        &self,
        filter: &str,
        page: i64,
        page_size: usize,
    ) -> StoreResult<(Vec<Post>, usize)> {
        let mut conn = self.conn()?;
        // Count and page come from the same snapshot
        let tx = conn.transaction()?;

        let total = count(&tx, &format!("SELECT COUNT(*) FROM posts {}", filter))?;
        let offset = page_offset(page, page_size);
        if offset >= total {
            return Ok((Vec::new(), total));
        }

        let sql = format!(
            "SELECT {} FROM posts {} {} LIMIT ? OFFSET ?",
            POST_COLUMNS, filter, LISTING_ORDER
        );
        let posts = self.query_posts(&tx, &sql, params![to_i64(page_size), to_i64(offset)])?;
        tx.commit()?;
        Ok((posts, total))
    }

    fn hydrate_post(&self, row: PostRow) -> StoreResult<Post> {
        // Empty text and JSON `null` both mean no tags
        let tags = if row.tags.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str::<Option<Vec<String>>>(&row.tags)
                .map_err(|e| StorageError::InvalidFormat {
                    path: self.path.clone(),
                    details: format!("tags of post '{}': {}", row.slug, e),
                })?
                .unwrap_or_default()
        };

        Ok(Post {
            created_at: self.parse_timestamp(&row.created_at)?,
            updated_at: self.parse_timestamp(&row.updated_at)?,
            title: row.title,
            slug: row.slug,
            summary: row.summary,
            content: row.content,
            category: row.category,
            tags,
            cover_image: row.cover_image,
            featured: row.featured,
            is_draft: row.is_draft,
        })
    }

    fn parse_timestamp(&self, value: &str) -> StorageResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StorageError::InvalidFormat {
                path: self.path.clone(),
                details: format!("timestamp '{}': {}", value, e),
            })
    }
}

impl PostStore for SqliteStore {
    fn list(&self) -> StoreResult<Vec<Post>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM posts {}", POST_COLUMNS, LISTING_ORDER);
        self.query_posts(&conn, &sql, [])
    }

    fn list_published(&self) -> StoreResult<Vec<Post>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM posts WHERE is_draft = 0 {}",
            POST_COLUMNS, LISTING_ORDER
        );
        self.query_posts(&conn, &sql, [])
    }

    fn list_paginated(&self, page: i64, page_size: usize) -> StoreResult<(Vec<Post>, usize)> {
        self.paginate_where("", page, page_size)
    }

    fn list_published_paginated(
        &self,
        page: i64,
        page_size: usize,
    ) -> StoreResult<(Vec<Post>, usize)> {
        self.paginate_where("WHERE is_draft = 0", page, page_size)
    }

    fn get_by_slug(&self, slug: &str) -> StoreResult<Option<Post>> {
        let conn = self.conn()?;
        let sql = format!("SELECT {} FROM posts WHERE slug = ?", POST_COLUMNS);
        Ok(self.query_posts(&conn, &sql, params![slug])?.into_iter().next())
    }

    fn get_related(&self, slug: &str, n: usize) -> StoreResult<Vec<Post>> {
        let Some(source) = self.get_by_slug(slug)? else {
            return Ok(Vec::new());
        };
        if source.tags.is_empty() {
            return Ok(Vec::new());
        }
        Ok(rank_related(&source, self.list_published()?, n))
    }

    fn create(&self, mut post: Post) -> StoreResult<Post> {
        if post.slug.is_empty() {
            return Err(StoreError::InvalidSlug);
        }

        let now = Utc::now();
        if !post.has_created_at() {
            post.created_at = now;
        }
        post.updated_at = now;
        let tags = serde_json::to_string(&post.tags)?;

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if slug_exists(&tx, &post.slug)? {
            return Err(StoreError::DuplicateSlug(post.slug));
        }

        tx.execute(
            &format!(
                "INSERT INTO posts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                POST_COLUMNS
            ),
            params![
                post.slug,
                post.title,
                post.summary,
                post.content,
                post.category,
                tags,
                post.cover_image,
                post.featured,
                post.is_draft,
                format_timestamp(&post.created_at),
                format_timestamp(&post.updated_at),
            ],
        )?;
        tx.commit()?;

        Ok(post)
    }

    fn update(&self, slug: &str, mut post: Post) -> StoreResult<Post> {
        if slug.is_empty() {
            return Err(StoreError::InvalidSlug);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let created_at: Option<String> = tx
            .query_row(
                "SELECT created_at FROM posts WHERE slug = ?",
                params![slug],
                |row| row.get(0),
            )
            .optional()?;
        let Some(created_at) = created_at else {
            return Err(StoreError::NotFound(slug.to_string()));
        };

        if post.slug.is_empty() {
            post.slug = slug.to_string();
        } else if post.slug != slug && slug_exists(&tx, &post.slug)? {
            return Err(StoreError::DuplicateSlug(post.slug));
        }

        post.created_at = self.parse_timestamp(&created_at)?;
        post.updated_at = Utc::now();
        let tags = serde_json::to_string(&post.tags)?;

        tx.execute(
            r#"
            UPDATE posts SET
                slug = ?1, title = ?2, summary = ?3, content = ?4, category = ?5,
                tags = ?6, cover_image = ?7, featured = ?8, is_draft = ?9, updated_at = ?10
            WHERE slug = ?11
            "#,
            params![
                post.slug,
                post.title,
                post.summary,
                post.content,
                post.category,
                tags,
                post.cover_image,
                post.featured,
                post.is_draft,
                format_timestamp(&post.updated_at),
                slug,
            ],
        )?;
        tx.commit()?;

        Ok(post)
    }

    fn delete(&self, slug: &str) -> StoreResult<()> {
        if slug.is_empty() {
            return Err(StoreError::InvalidSlug);
        }

        let deleted = self
            .conn()?
            .execute("DELETE FROM posts WHERE slug = ?", params![slug])?;
        if deleted == 0 {
            return Err(StoreError::NotFound(slug.to_string()));
        }
        Ok(())
    }
}

// ==================== Internal structs ====================

struct PostRow {
    slug: String,
    title: String,
    summary: String,
    content: String,
    category: String,
    tags: String,
    cover_image: String,
    featured: bool,
    is_draft: bool,
    created_at: String,
    updated_at: String,
}

fn read_post_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        slug: row.get(0)?,
        title: row.get(1)?,
        summary: row.get(2)?,
        content: row.get(3)?,
        category: row.get(4)?,
        tags: row.get(5)?,
        cover_image: row.get(6)?,
        featured: row.get(7)?,
        is_draft: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

// ==================== Connection helpers ====================

/// Per-connection setup run by the pool
fn configure_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    if !mode.eq_ignore_ascii_case("wal") {
        warn!("SQLite refused WAL mode, running with journal_mode={}", mode);
    }
    Ok(())
}

fn slug_exists(conn: &Connection, slug: &str) -> rusqlite::Result<bool> {
    conn.prepare("SELECT 1 FROM posts WHERE slug = ?")?
        .exists(params![slug])
}

fn count(conn: &Connection, sql: &str) -> rusqlite::Result<usize> {
    let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
    Ok(usize::try_from(n).unwrap_or(0))
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Fixed-width UTC text, so lexical order is chronological order
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn open(temp_dir: &TempDir) -> SqliteStore {
        SqliteStore::open(temp_dir.path().join("blog.db")).unwrap()
    }

    #[test]
    fn test_open_creates_database_and_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("blog.db");

        let store = SqliteStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path.as_path());
    }

    #[test]
    fn test_wal_and_busy_timeout_enabled() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        let conn = store.conn().unwrap();

        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");

        let timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 5000);
    }

    #[test]
    fn test_booleans_and_tags_columns() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);

        let mut post = Post::new("flags", "Flags").with_tags(["a", "b", "a"]);
        post.featured = true;
        post.is_draft = true;
        store.create(post).unwrap();

        let conn = store.conn().unwrap();
        let (featured, is_draft, tags): (i64, i64, String) = conn
            .query_row(
                "SELECT featured, is_draft, tags FROM posts WHERE slug = 'flags'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!((featured, is_draft), (1, 1));
        assert_eq!(tags, r#"["a","b","a"]"#);

        let fetched = store.get_by_slug("flags").unwrap().unwrap();
        assert!(fetched.featured);
        assert!(fetched.is_draft);
        assert_eq!(fetched.tags, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_null_tags_column_reads_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        store.create(Post::new("untagged", "Untagged")).unwrap();

        store
            .conn()
            .unwrap()
            .execute("UPDATE posts SET tags = 'null' WHERE slug = 'untagged'", [])
            .unwrap();

        let fetched = store.get_by_slug("untagged").unwrap().unwrap();
        assert!(fetched.tags.is_empty());
        assert!(store.get_related("untagged", 3).unwrap().is_empty());
    }

    #[test]
    fn test_open_rejects_unversioned_posts_table() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("blog.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE posts (id INTEGER PRIMARY KEY, slug TEXT, created_at INTEGER);
                 INSERT INTO posts (slug, created_at) VALUES ('legacy', 1700000000);",
            )
            .unwrap();
        }

        let err = SqliteStore::open(&path).err().unwrap();
        assert!(matches!(
            err,
            StoreError::Storage(StorageError::InvalidFormat { .. })
        ));

        // The foreign table is left untouched
        let conn = Connection::open(&path).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_reopen_existing_database() {
        let temp_dir = TempDir::new().unwrap();
        open(&temp_dir).create(Post::new("kept", "Kept")).unwrap();

        let reopened = open(&temp_dir);
        assert!(reopened.get_by_slug("kept").unwrap().is_some());
    }

    #[test]
    fn test_timestamps_round_trip_exactly() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);

        let created = Utc.with_ymd_and_hms(2021, 7, 4, 10, 0, 0).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let stored = store
            .create(Post::new("ts", "Timestamps").with_created_at(created))
            .unwrap();

        let fetched = store.get_by_slug("ts").unwrap().unwrap();
        assert_eq!(fetched.created_at, created);
        assert_eq!(fetched.updated_at, stored.updated_at);
    }

    #[test]
    fn test_timestamp_text_sorts_chronologically() {
        let earlier = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let later = earlier + chrono::Duration::nanoseconds(1);
        assert!(format_timestamp(&earlier) < format_timestamp(&later));
        assert_eq!(format_timestamp(&earlier).len(), format_timestamp(&later).len());
    }

    #[test]
    fn test_subscribers_soft_delete_and_reactivate() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);

        store.add_subscriber("a@example.com").unwrap();
        store.add_subscriber("b@example.com").unwrap();
        assert_eq!(store.list_subscribers().unwrap().len(), 2);

        store.remove_subscriber("a@example.com").unwrap();
        let active = store.list_subscribers().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].email, "b@example.com");

        // Re-subscribing reactivates the existing row
        store.add_subscriber("a@example.com").unwrap();
        assert_eq!(store.list_subscribers().unwrap().len(), 2);

        let rows: i64 = store
            .conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM subscribers", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_remove_unknown_subscriber_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        store.remove_subscriber("nobody@example.com").unwrap();
        assert!(store.list_subscribers().unwrap().is_empty());
    }

    #[test]
    fn test_empty_subscriber_email_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let store = open(&temp_dir);
        assert!(matches!(
            store.add_subscriber(""),
            Err(StoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_concurrent_writers_do_not_fail() {
        use std::sync::Arc;
        use std::thread;

        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(open(&temp_dir));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..10 {
                        store
                            .create(Post::new(format!("t{}-{}", t, i), "Concurrent"))
                            .unwrap();
                        store.list_published_paginated(1, 5).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.list().unwrap().len(), 40);
    }
}
