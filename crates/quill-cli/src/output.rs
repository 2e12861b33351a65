//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use anyhow::{Context, Result};
use serde::Serialize;

use quill_core::{Post, SiteProfile, Subscriber};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single post
    pub fn print_post(&self, post: &Post) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("Slug:        {}", post.slug);
                println!("Title:       {}", post.title);
                if !post.summary.is_empty() {
                    println!("Summary:     {}", post.summary);
                }
                if !post.category.is_empty() {
                    println!("Category:    {}", post.category);
                }
                if !post.tags.is_empty() {
                    println!("Tags:        {}", post.tags.join(", "));
                }
                println!("Status:      {}", status_label(post));
                println!("Read time:   {} min", post.read_time_minutes());
                println!("Created:     {}", post.created_at.format("%Y-%m-%d %H:%M"));
                println!("Updated:     {}", post.updated_at.format("%Y-%m-%d %H:%M"));

                if !post.content.is_empty() {
                    println!();
                    println!("{}", post.content);
                }
            }
            OutputFormat::Json => print_json(post)?,
            OutputFormat::Quiet => println!("{}", post.slug),
        }
        Ok(())
    }

    /// Print a list of posts
    ///
    /// `total` is the size of the whole listing when `posts` is one page of it.
    pub fn print_posts(&self, posts: &[Post], total: Option<usize>) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if posts.is_empty() {
                    println!("No posts found.");
                    return Ok(());
                }
                for post in posts {
                    println!(
                        "{} | {} | {} | {}",
                        post.created_at.format("%Y-%m-%d"),
                        truncate(&post.slug, 30),
                        truncate(&post.title, 40),
                        status_label(post)
                    );
                }
                match total {
                    Some(total) => println!("\n{} of {} post(s)", posts.len(), total),
                    None => println!("\n{} post(s)", posts.len()),
                }
            }
            OutputFormat::Json => match total {
                Some(total) => print_json(&serde_json::json!({
                    "posts": posts,
                    "total": total
                }))?,
                None => print_json(&posts)?,
            },
            OutputFormat::Quiet => {
                for post in posts {
                    println!("{}", post.slug);
                }
            }
        }
        Ok(())
    }

    /// Print the site profile
    pub fn print_profile(&self, profile: &SiteProfile) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("{}", profile.title);
                if !profile.tagline.is_empty() {
                    println!("{}", profile.tagline);
                }
                println!();
                if !profile.intro.is_empty() {
                    println!("{}", profile.intro);
                    println!();
                }
                if !profile.location.is_empty() {
                    println!("Location:    {}", profile.location);
                }
                if !profile.email.is_empty() {
                    println!("Email:       {}", profile.email);
                }
                if !profile.skills.is_empty() {
                    println!("Skills:      {}", profile.skills.join(", "));
                }
                if !profile.current_focus.is_empty() {
                    println!();
                    println!("Current focus:");
                    for item in &profile.current_focus {
                        println!("  - {}", item);
                    }
                }
                if !profile.social_links.is_empty() {
                    println!();
                    println!("Links:");
                    for link in &profile.social_links {
                        println!("  {}: {}", link.name, link.url);
                    }
                }
            }
            OutputFormat::Json => print_json(profile)?,
            OutputFormat::Quiet => println!("{}", profile.title),
        }
        Ok(())
    }

    /// Print active subscribers
    pub fn print_subscribers(&self, subscribers: &[Subscriber]) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                if subscribers.is_empty() {
                    println!("No subscribers.");
                    return Ok(());
                }
                for subscriber in subscribers {
                    println!(
                        "{} | {}",
                        subscriber.created_at.format("%Y-%m-%d"),
                        subscriber.email
                    );
                }
                println!("\n{} subscriber(s)", subscribers.len());
            }
            OutputFormat::Json => print_json(&subscribers)?,
            OutputFormat::Quiet => {
                for subscriber in subscribers {
                    println!("{}", subscriber.email);
                }
            }
        }
        Ok(())
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn status_label(post: &Post) -> &'static str {
    match (post.is_draft, post.featured) {
        (true, _) => "draft",
        (false, true) => "featured",
        (false, false) => "published",
    }
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
