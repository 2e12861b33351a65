//! Subscriber command handlers
//!
//! Subscribers live only in the SQLite database, whatever backend holds posts.

use anyhow::{Context, Result};

use quill_core::{Config, SqliteStore};

use crate::output::Output;

/// Open the database holding subscribers
pub fn open(config: &Config) -> Result<SqliteStore> {
    SqliteStore::open(config.sqlite_path()).context("Failed to open subscriber database")
}

/// Subscribe an email address
pub fn add(store: &SqliteStore, email: &str, output: &Output) -> Result<()> {
    store
        .add_subscriber(email.trim())
        .context("Failed to add subscriber")?;
    output.success(&format!("Subscribed: {}", email.trim()));
    Ok(())
}

/// Unsubscribe an email address
pub fn remove(store: &SqliteStore, email: &str, output: &Output) -> Result<()> {
    store
        .remove_subscriber(email.trim())
        .context("Failed to remove subscriber")?;
    output.success(&format!("Unsubscribed: {}", email.trim()));
    Ok(())
}

/// List active subscribers
pub fn list(store: &SqliteStore, output: &Output) -> Result<()> {
    let subscribers = store.list_subscribers()?;
    output.print_subscribers(&subscribers)
}
