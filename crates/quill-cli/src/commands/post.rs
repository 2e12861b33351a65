//! Post command handlers

use anyhow::{anyhow, bail, Context, Result};

use quill_core::{Post, PostStore};

use crate::output::Output;
use crate::prompt::confirm;

/// List posts, either all of them or one page
pub fn list(
    store: &dyn PostStore,
    published: bool,
    page: Option<i64>,
    per_page: usize,
    output: &Output,
) -> Result<()> {
    match page {
        Some(page) => {
            if per_page == 0 {
                bail!("--per-page must be at least 1");
            }
            let (posts, total) = if published {
                store.list_published_paginated(page, per_page)?
            } else {
                store.list_paginated(page, per_page)?
            };
            output.print_posts(&posts, Some(total))
        }
        None => {
            let posts = if published {
                store.list_published()?
            } else {
                store.list()?
            };
            output.print_posts(&posts, None)
        }
    }
}

/// Show a single post
pub fn show(store: &dyn PostStore, slug: &str, output: &Output) -> Result<()> {
    let post = find(store, slug)?;
    output.print_post(&post)
}

/// Show posts related to `slug` by shared tags
pub fn related(store: &dyn PostStore, slug: &str, n: usize, output: &Output) -> Result<()> {
    let posts = store
        .get_related(slug, n)
        .with_context(|| format!("Failed to rank posts related to {}", slug))?;
    output.print_posts(&posts, None)
}

/// Create a new post
pub fn create(store: &dyn PostStore, post: Post, output: &Output) -> Result<()> {
    let stored = store.create(post).context("Failed to create post")?;

    output.success(&format!("Created post: {}", stored.slug));
    if !output.is_quiet() {
        output.print_post(&stored)?;
    }
    Ok(())
}

/// Field changes for `post edit`; `None` keeps the current value
#[derive(Debug, Default)]
pub struct PostChanges {
    pub slug: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_draft: Option<bool>,
    pub featured: Option<bool>,
    pub content: Option<String>,
}

impl PostChanges {
    fn apply(self, mut post: Post) -> Post {
        if let Some(slug) = self.slug {
            post.slug = slug;
        }
        if let Some(title) = self.title {
            post.title = title;
        }
        if let Some(summary) = self.summary {
            post.summary = summary;
        }
        if let Some(category) = self.category {
            post.category = category;
        }
        if let Some(tags) = self.tags {
            post.tags = tags;
        }
        if let Some(is_draft) = self.is_draft {
            post.is_draft = is_draft;
        }
        if let Some(featured) = self.featured {
            post.featured = featured;
        }
        if let Some(content) = self.content {
            post.content = content;
        }
        post
    }
}

/// Edit a post in place, optionally renaming it
pub fn edit(store: &dyn PostStore, slug: &str, changes: PostChanges, output: &Output) -> Result<()> {
    let current = find(store, slug)?;
    let updated = store
        .update(slug, changes.apply(current))
        .with_context(|| format!("Failed to update post {}", slug))?;

    output.success(&format!("Updated post: {}", updated.slug));
    if !output.is_quiet() {
        output.print_post(&updated)?;
    }
    Ok(())
}

/// Delete a post
pub fn delete(store: &dyn PostStore, slug: &str, output: &Output) -> Result<()> {
    let post = find(store, slug)?;

    // Confirm deletion
    if output.should_prompt() {
        println!("Delete post: {} - {}", post.slug, post.title);
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store
        .delete(slug)
        .with_context(|| format!("Failed to delete post {}", slug))?;

    output.success(&format!("Deleted post: {}", slug));
    Ok(())
}

fn find(store: &dyn PostStore, slug: &str) -> Result<Post> {
    store
        .get_by_slug(slug)?
        .ok_or_else(|| anyhow!("Post not found: {}", slug))
}
