//! Listing order, pagination and related-post ranking
//!
//! Both store backends route their results through these functions so that
//! ordering, page windows and ranking are identical regardless of backend.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::Post;

/// Newest creation time first; equal timestamps fall back to slug ascending.
///
/// The SQLite backend expresses the same order as
/// `ORDER BY created_at DESC, slug ASC`.
pub fn newest_first(a: &Post, b: &Post) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.slug.cmp(&b.slug))
}

/// Sort posts in listing order
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(newest_first);
}

/// Offset of the first row of a 1-based `page`; pages below 1 clamp to 1.
pub fn page_offset(page: i64, page_size: usize) -> usize {
    let index = usize::try_from(page.max(1) - 1).unwrap_or(usize::MAX);
    index.saturating_mul(page_size)
}

/// Slice one page out of an already sorted population.
///
/// Returns the page and the size of the whole population. An out-of-range
/// page is empty, never an error.
pub fn paginate(posts: Vec<Post>, page: i64, page_size: usize) -> (Vec<Post>, usize) {
    let total = posts.len();
    let start = page_offset(page, page_size);
    if start >= total {
        return (Vec::new(), total);
    }
    let page = posts.into_iter().skip(start).take(page_size).collect();
    (page, total)
}

/// Number of distinct tags `candidate` shares with `source_tags`
pub fn shared_tag_count(source_tags: &HashSet<&str>, candidate: &Post) -> usize {
    candidate
        .tags
        .iter()
        .map(String::as_str)
        .collect::<HashSet<_>>()
        .intersection(source_tags)
        .count()
}

/// Rank `pool` by tag overlap with `source` and keep the best `n`.
///
/// Drafts and the source itself are never candidates; candidates sharing no
/// tag are dropped. Higher overlap ranks first, then newer posts.
pub fn rank_related<I>(source: &Post, pool: I, n: usize) -> Vec<Post>
where
    I: IntoIterator<Item = Post>,
{
    if source.tags.is_empty() || n == 0 {
        return Vec::new();
    }

    let source_tags: HashSet<&str> = source.tags.iter().map(String::as_str).collect();

    let mut scored: Vec<(usize, Post)> = pool
        .into_iter()
        .filter(|p| !p.is_draft && p.slug != source.slug)
        .filter_map(|p| {
            let score = shared_tag_count(&source_tags, &p);
            (score > 0).then_some((score, p))
        })
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| newest_first(a, b)));
    scored.truncate(n);
    scored.into_iter().map(|(_, p)| p).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn post(slug: &str, tags: &[&str], age_days: i64) -> Post {
        let base = Utc.with_ymd_and_hms(2024, 1, 31, 12, 0, 0).unwrap();
        Post::new(slug, slug)
            .with_tags(tags.iter().copied())
            .with_created_at(base - Duration::days(age_days))
    }

    fn slugs(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.slug.as_str()).collect()
    }

    #[test]
    fn test_sort_newest_first() {
        let mut posts = vec![post("old", &[], 3), post("new", &[], 1), post("mid", &[], 2)];
        sort_newest_first(&mut posts);
        assert_eq!(slugs(&posts), vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_sort_ties_break_on_slug() {
        let mut posts = vec![post("b", &[], 1), post("a", &[], 1), post("c", &[], 1)];
        sort_newest_first(&mut posts);
        assert_eq!(slugs(&posts), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_page_offset_clamps_low_pages() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(0, 10), 0);
        assert_eq!(page_offset(-5, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
        assert_eq!(page_offset(i64::MAX, usize::MAX), usize::MAX);
    }

    #[test]
    fn test_paginate_windows() {
        let posts: Vec<Post> = (0..5).map(|i| post(&format!("p{}", i), &[], i)).collect();

        let (page, total) = paginate(posts.clone(), 1, 2);
        assert_eq!(slugs(&page), vec!["p0", "p1"]);
        assert_eq!(total, 5);

        let (page, total) = paginate(posts.clone(), 3, 2);
        assert_eq!(slugs(&page), vec!["p4"]);
        assert_eq!(total, 5);

        let (page, total) = paginate(posts, 0, 2);
        assert_eq!(slugs(&page), vec!["p0", "p1"]);
        assert_eq!(total, 5);
    }

    #[test]
    fn test_paginate_past_the_end_is_empty_with_true_total() {
        for total in 0..12usize {
            for page_size in 1..5usize {
                let posts: Vec<Post> = (0..total)
                    .map(|i| post(&format!("p{}", i), &[], i as i64))
                    .collect();
                let past_end = (total.div_ceil(page_size) + 1) as i64;
                let (page, reported) = paginate(posts, past_end, page_size);
                assert!(page.is_empty());
                assert_eq!(reported, total);
            }
        }
    }

    #[test]
    fn test_rank_related_orders_by_score_then_recency() {
        let a = post("a", &["x", "y"], 0);
        let pool = vec![
            a.clone(),
            post("b", &["x"], 1),
            post("c", &["x", "y"], 5),
            post("d", &["z"], 2),
        ];

        let related = rank_related(&a, pool, 2);
        assert_eq!(slugs(&related), vec!["c", "b"]);
    }

    #[test]
    fn test_rank_related_excludes_drafts() {
        let a = post("a", &["x", "y"], 0);
        let pool = vec![
            post("draft", &["x", "y"], 1).draft(true),
            post("b", &["x"], 2),
        ];

        let related = rank_related(&a, pool, 5);
        assert_eq!(slugs(&related), vec!["b"]);
    }

    #[test]
    fn test_rank_related_equal_scores_newest_first() {
        let a = post("a", &["x"], 0);
        let pool = vec![post("older", &["x"], 9), post("newer", &["x"], 1)];

        let related = rank_related(&a, pool, 5);
        assert_eq!(slugs(&related), vec!["newer", "older"]);
    }

    #[test]
    fn test_rank_related_is_case_sensitive() {
        let a = post("a", &["Rust"], 0);
        let pool = vec![post("b", &["rust"], 1)];
        assert!(rank_related(&a, pool, 3).is_empty());
    }

    #[test]
    fn test_rank_related_counts_each_shared_tag_once() {
        let a = post("a", &["x", "y"], 0);
        let pool = vec![post("dup", &["x", "x", "x"], 1), post("both", &["x", "y"], 5)];

        let related = rank_related(&a, pool, 5);
        assert_eq!(slugs(&related), vec!["both", "dup"]);
    }

    #[test]
    fn test_rank_related_without_source_tags_is_empty() {
        let a = post("a", &[], 0);
        let pool = vec![post("b", &["x"], 1)];
        assert!(rank_related(&a, pool, 3).is_empty());
    }

    #[test]
    fn test_rank_related_limit() {
        let a = post("a", &["x"], 0);
        let pool: Vec<Post> = (1..10).map(|i| post(&format!("p{}", i), &["x"], i)).collect();
        assert_eq!(rank_related(&a, pool.clone(), 3).len(), 3);
        assert!(rank_related(&a, pool, 0).is_empty());
    }
}
