//! Status command handler

use anyhow::{Context, Result};

use quill_core::{open_store, Config, SqliteStore, StoreBackend};

use crate::output::{Output, OutputFormat};

/// Show store location and contents
pub fn show(config: &Config, output: &Output) -> Result<()> {
    let store = open_store(config).context("Failed to open post store")?;
    let total = store.list()?.len();
    let published = store.list_published()?.len();
    let drafts = total - published;

    let store_path = match config.store_backend {
        StoreBackend::Sqlite => config.sqlite_path(),
        StoreBackend::Json => config.posts_json_path(),
    };

    // Subscribers only exist once the database does
    let subscribers = if config.sqlite_path().exists() {
        Some(
            SqliteStore::open(config.sqlite_path())?
                .list_subscribers()?
                .len(),
        )
    } else {
        None
    };

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "backend": config.store_backend.to_string(),
                    "store_path": store_path,
                    "data_dir": config.data_dir,
                    "site_base_url": config.site_base_url,
                    "admin_base_url": config.admin_base_url,
                    "counts": {
                        "posts": total,
                        "published": published,
                        "drafts": drafts,
                        "subscribers": subscribers.unwrap_or(0)
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", total);
        }
        OutputFormat::Human => {
            println!("Quill Status");
            println!("============");
            println!();
            println!("Storage:");
            println!("  Backend:  {}", config.store_backend);
            println!("  Location: {}", store_path.display());
            println!();
            println!("URLs:");
            println!("  Site:  {}", config.site_base_url);
            println!("  Admin: {}", config.admin_base_url);
            println!();
            println!("Contents:");
            println!("  Posts:       {}", total);
            println!("  Published:   {}", published);
            println!("  Drafts:      {}", drafts);
            println!("  Subscribers: {}", subscribers.unwrap_or(0));
        }
    }

    Ok(())
}
