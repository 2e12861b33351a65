//! Config command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use quill_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
///
/// The admin password is never printed.
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "public_addr": config.public_addr,
                    "admin_addr": config.admin_addr,
                    "admin_user": config.admin_user,
                    "site_base_url": config.site_base_url,
                    "admin_base_url": config.admin_base_url,
                    "data_dir": config.data_dir,
                    "store_backend": config.store_backend.to_string(),
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  public_addr:    {}", config.public_addr);
            println!("  admin_addr:     {}", config.admin_addr);
            println!("  admin_user:     {}", config.admin_user);
            println!("  site_base_url:  {}", or_unset(&config.site_base_url));
            println!("  admin_base_url: {}", or_unset(&config.admin_base_url));
            println!("  data_dir:       {}", config.data_dir.display());
            println!("  store_backend:  {}", config.store_backend);
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "(not set)"
    } else {
        value
    }
}
