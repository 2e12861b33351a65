//! JSON-file post store
//!
//! Holds the whole post collection in memory and mirrors it to a single JSON
//! array on disk. Readers share an `RwLock`; every mutation takes the write
//! lock, builds the new collection, persists it with an atomic write and only
//! then swaps it in, so memory never runs ahead of the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use tracing::debug;

use crate::models::Post;
use crate::query::{paginate, rank_related, sort_newest_first};
use crate::storage::atomic::atomic_write;
use crate::storage::error::{StorageError, StorageResult};
use crate::store::{PostStore, StoreError, StoreResult};

/// Post store backed by one JSON document
pub struct FileStore {
    path: PathBuf,
    posts: RwLock<Vec<Post>>,
}

impl FileStore {
    /// Load the collection from `path`; a missing or empty file is an empty store
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let posts = load_posts(&path)?;
        debug!("Loaded {} posts from {:?}", posts.len(), path);
        Ok(Self {
            path,
            posts: RwLock::new(posts),
        })
    }

    /// Path of the backing JSON document
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Post>> {
        self.posts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Post>> {
        self.posts.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Persist `next` and install it as the in-memory collection
    fn commit(&self, guard: &mut RwLockWriteGuard<'_, Vec<Post>>, next: Vec<Post>) -> StoreResult<()> {
        save_posts(&self.path, &next)?;
        **guard = next;
        Ok(())
    }

    fn sorted(&self, published_only: bool) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .read()
            .iter()
            .filter(|p| !published_only || !p.is_draft)
            .cloned()
            .collect();
        sort_newest_first(&mut posts);
        posts
    }
}

impl PostStore for FileStore {
    fn list(&self) -> StoreResult<Vec<Post>> {
        Ok(self.sorted(false))
    }

    fn list_published(&self) -> StoreResult<Vec<Post>> {
        Ok(self.sorted(true))
    }

    fn list_paginated(&self, page: i64, page_size: usize) -> StoreResult<(Vec<Post>, usize)> {
        Ok(paginate(self.sorted(false), page, page_size))
    }

    fn list_published_paginated(
        &self,
        page: i64,
        page_size: usize,
    ) -> StoreResult<(Vec<Post>, usize)> {
        Ok(paginate(self.sorted(true), page, page_size))
    }

    fn get_by_slug(&self, slug: &str) -> StoreResult<Option<Post>> {
        Ok(self.read().iter().find(|p| p.slug == slug).cloned())
    }

    fn get_related(&self, slug: &str, n: usize) -> StoreResult<Vec<Post>> {
        let posts = self.read();
        let Some(source) = posts.iter().find(|p| p.slug == slug) else {
            return Ok(Vec::new());
        };
        Ok(rank_related(source, posts.iter().cloned(), n))
    }

    fn create(&self, mut post: Post) -> StoreResult<Post> {
        if post.slug.is_empty() {
            return Err(StoreError::InvalidSlug);
        }

        let mut guard = self.write();
        if guard.iter().any(|p| p.slug == post.slug) {
            return Err(StoreError::DuplicateSlug(post.slug));
        }

        let now = Utc::now();
        if !post.has_created_at() {
            post.created_at = now;
        }
        post.updated_at = now;

        let mut next = guard.clone();
        next.push(post.clone());
        self.commit(&mut guard, next)?;
        Ok(post)
    }

    fn update(&self, slug: &str, mut post: Post) -> StoreResult<Post> {
        if slug.is_empty() {
            return Err(StoreError::InvalidSlug);
        }

        let mut guard = self.write();
        let index = guard
            .iter()
            .position(|p| p.slug == slug)
            .ok_or_else(|| StoreError::NotFound(slug.to_string()))?;

        if post.slug.is_empty() {
            post.slug = slug.to_string();
        } else if post.slug != slug && guard.iter().any(|p| p.slug == post.slug) {
            return Err(StoreError::DuplicateSlug(post.slug));
        }

        post.created_at = guard[index].created_at;
        post.updated_at = Utc::now();

        let mut next = guard.clone();
        next[index] = post.clone();
        self.commit(&mut guard, next)?;
        Ok(post)
    }

    fn delete(&self, slug: &str) -> StoreResult<()> {
        if slug.is_empty() {
            return Err(StoreError::InvalidSlug);
        }

        let mut guard = self.write();
        let index = guard
            .iter()
            .position(|p| p.slug == slug)
            .ok_or_else(|| StoreError::NotFound(slug.to_string()))?;

        let mut next = guard.clone();
        next.remove(index);
        self.commit(&mut guard, next)
    }
}

fn load_posts(path: &Path) -> StorageResult<Vec<Post>> {
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StorageError::from_read(e, path.to_path_buf())),
    };

    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    serde_json::from_slice(&data).map_err(|e| StorageError::InvalidFormat {
        path: path.to_path_buf(),
        details: e.to_string(),
    })
}

fn save_posts(path: &Path, posts: &[Post]) -> StorageResult<()> {
    let mut data = serde_json::to_vec_pretty(posts)?;
    data.push(b'\n');
    atomic_write(path, &data)
}
