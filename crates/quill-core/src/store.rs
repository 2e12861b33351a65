//! Post store contract
//!
//! `PostStore` is the capability interface consumed by the web layer and the
//! CLI. Two implementations exist:
//!
//! - [`FileStore`]: the whole collection in memory, mirrored to one JSON file
//! - [`SqliteStore`]: a `posts` table in an embedded SQLite database
//!
//! Both produce identical listing, pagination and related-post results for
//! the same data. [`open_store`] picks one based on configuration.
//!
//! ## Usage
//!
//! ```ignore
//! let store = open_store(&config)?;
//!
//! store.create(Post::new("hello-world", "Hello, World"))?;
//! let (page, total) = store.list_published_paginated(1, 10)?;
//! ```

use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, StoreBackend};
use crate::models::Post;
use crate::storage::{FileStore, SqliteStore, StorageError};

/// Errors returned by post store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Empty or missing slug given to a mutating call
    #[error("post slug is required")]
    InvalidSlug,

    /// Another post already uses this slug
    #[error("post slug already exists: '{0}'")]
    DuplicateSlug(String),

    /// No post with this slug
    #[error("post not found: '{0}'")]
    NotFound(String),

    /// Rejected input other than a slug
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Underlying disk or database failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Storage(e.into())
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(e: r2d2::Error) -> Self {
        StoreError::Storage(e.into())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Storage(e.into())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage contract shared by every post backend
///
/// Listings are ordered newest creation time first. Pages are 1-based; pages
/// below 1 are treated as 1 and pages past the end are empty. Paginated calls
/// return the page together with the size of the unsliced population.
pub trait PostStore: Send + Sync {
    /// All posts, drafts included
    fn list(&self) -> StoreResult<Vec<Post>>;

    /// All non-draft posts
    fn list_published(&self) -> StoreResult<Vec<Post>>;

    /// One page of all posts, plus the total post count
    fn list_paginated(&self, page: i64, page_size: usize) -> StoreResult<(Vec<Post>, usize)>;

    /// One page of non-draft posts, plus the total non-draft count
    fn list_published_paginated(
        &self,
        page: i64,
        page_size: usize,
    ) -> StoreResult<(Vec<Post>, usize)>;

    /// Exact slug lookup; drafts are returned too
    fn get_by_slug(&self, slug: &str) -> StoreResult<Option<Post>>;

    /// Up to `n` published posts ranked by shared tags with `slug`
    ///
    /// An unknown slug or a post without tags yields an empty list.
    fn get_related(&self, slug: &str, n: usize) -> StoreResult<Vec<Post>>;

    /// Insert a new post and return it as stored
    ///
    /// A caller-supplied creation time is kept; the update time is always now.
    fn create(&self, post: Post) -> StoreResult<Post>;

    /// Replace the post currently stored under `slug` and return it as stored
    ///
    /// An empty `post.slug` keeps the current slug; a different one renames
    /// the post. The creation time is always preserved.
    fn update(&self, slug: &str, post: Post) -> StoreResult<Post>;

    /// Remove the post stored under `slug`
    fn delete(&self, slug: &str) -> StoreResult<()>;
}

/// Open the post store selected by `config.store_backend`
pub fn open_store(config: &Config) -> StoreResult<Box<dyn PostStore>> {
    let store: Box<dyn PostStore> = match config.store_backend {
        StoreBackend::Json => Box::new(FileStore::open(config.posts_json_path())?),
        StoreBackend::Sqlite => Box::new(SqliteStore::open(config.sqlite_path())?),
    };
    info!("Opened {} post store in {:?}", config.store_backend, config.data_dir);
    Ok(store)
}

/// Outcome of [`import_posts`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Posts written to the destination
    pub imported: usize,
    /// Posts the destination rejected
    pub failed: usize,
    /// The destination already had posts, nothing was attempted
    pub skipped: bool,
}

/// Replay every post of `from` into an empty `into`
///
/// Creation timestamps are carried over. A post the destination rejects is
/// logged and counted, the rest are still imported.
pub fn import_posts(from: &dyn PostStore, into: &dyn PostStore) -> StoreResult<ImportReport> {
    if !into.list()?.is_empty() {
        info!("Destination store already has posts, skipping import");
        return Ok(ImportReport {
            skipped: true,
            ..ImportReport::default()
        });
    }

    let mut report = ImportReport::default();
    let posts = from.list()?;
    info!("Importing {} posts", posts.len());

    for post in posts {
        let slug = post.slug.clone();
        match into.create(post) {
            Ok(_) => report.imported += 1,
            Err(e) => {
                warn!("Failed to import post {}: {}", slug, e);
                report.failed += 1;
            }
        }
    }

    info!(
        "Import completed: {} imported, {} failed",
        report.imported, report.failed
    );
    Ok(report)
}
