//! Data models for Quill
//!
//! Defines the persisted records: Post, SiteProfile and Subscriber.
//! Field names match the on-disk JSON layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Characters of content read per minute
const READ_CHARS_PER_MINUTE: usize = 400;

/// Seconds since the Unix epoch of 0001-01-01T00:00:00Z, the zero time
/// written by older data files for posts that were never stamped
const ZERO_TIME_SECS: i64 = -62_135_596_800;

/// Read a list that may be absent or an explicit `null`
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A blog post, keyed by its slug
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Display title
    pub title: String,
    /// Unique, URL-safe identifier
    pub slug: String,
    #[serde(default)]
    pub summary: String,
    /// Raw markup text
    #[serde(default)]
    pub content: String,
    /// Single label; empty when uncategorised
    #[serde(default)]
    pub category: String,
    /// Labels used for related-post ranking; not deduplicated
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub cover_image: String,
    #[serde(default)]
    pub featured: bool,
    /// Drafts are hidden from public listings and ranking
    #[serde(default)]
    pub is_draft: bool,
    /// When this post was created (the Unix epoch or the zero time mean "not yet stamped")
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    /// When this post was last written
    #[serde(default)]
    pub updated_at: DateTime<Utc>,
}

impl Post {
    /// Create an unstamped post; the store sets timestamps on `create`
    pub fn new(slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Builder-style tag setter
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Builder-style creation time, for replaying posts with their original timestamps
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Builder-style draft flag
    pub fn draft(mut self, is_draft: bool) -> Self {
        self.is_draft = is_draft;
        self
    }

    /// Whether the caller supplied a creation time
    pub fn has_created_at(&self) -> bool {
        self.created_at != DateTime::<Utc>::UNIX_EPOCH
            && self.created_at.timestamp() != ZERO_TIME_SECS
    }

    /// Estimated reading time in whole minutes, never less than one
    pub fn read_time_minutes(&self) -> usize {
        (self.content.chars().count() / READ_CHARS_PER_MINUTE).max(1)
    }
}

/// A named link shown on the profile page
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SocialLink {
    pub name: String,
    pub url: String,
}

/// The single site-wide profile record
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SiteProfile {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub intro: String,
    #[serde(default)]
    pub positioning: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub skills: Vec<String>,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub avatar_pos_x: f64,
    #[serde(default)]
    pub avatar_pos_y: f64,
    #[serde(default)]
    pub avatar_scale: f64,
    #[serde(default)]
    pub location: String,
    /// Contact email
    #[serde(default)]
    pub email: String,
    /// Newsletter blurb
    #[serde(default)]
    pub newsletter: String,
    /// Ordered "current focus" items
    #[serde(default, deserialize_with = "null_as_empty")]
    pub current_focus: Vec<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub social_links: Vec<SocialLink>,
}

impl SiteProfile {
    /// The profile written on first start
    pub fn default_profile() -> Self {
        Self {
            title: "Quill".to_string(),
            tagline: "Notes on products, engineering and writing".to_string(),
            intro: "I build products meant to grow for a long time, and I like clear structure, maintainable code and honest prose.".to_string(),
            positioning: "Long-term product and engineering writer; writing is how I think.".to_string(),
            skills: vec![
                "Product strategy".to_string(),
                "Systems architecture".to_string(),
                "Writing systems".to_string(),
                "Personal knowledge management".to_string(),
            ],
            avatar: String::new(),
            avatar_pos_x: 50.0,
            avatar_pos_y: 50.0,
            avatar_scale: 1.0,
            location: "Somewhere - Earth".to_string(),
            email: "hi@example.com".to_string(),
            newsletter: "One letter a month: retrospectives, tools, writing.".to_string(),
            current_focus: vec![
                "Building a publishing workflow".to_string(),
                "Writing about long-term product thinking".to_string(),
                "Recording engineering practice and retrospectives".to_string(),
            ],
            social_links: vec![SocialLink {
                name: "GitHub".to_string(),
                url: "https://github.com/".to_string(),
            }],
        }
    }
}

/// A newsletter subscriber, keyed by email
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscriber {
    pub email: String,
    /// Cleared on unsubscribe; set again on re-subscribe
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
