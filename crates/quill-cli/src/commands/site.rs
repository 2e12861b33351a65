//! Site profile command handlers

use anyhow::{Context, Result};

use quill_core::{Config, SiteStore};

use crate::output::Output;

/// Show the site profile, writing the default one on first use
pub fn show(config: &Config, output: &Output) -> Result<()> {
    let site = SiteStore::open(config.site_json_path()).context("Failed to open site profile")?;
    output.print_profile(&site.get())
}
