//! Import command handler

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use quill_core::{import_posts, Config, FileStore, ImportReport, SqliteStore};

use crate::output::{Output, OutputFormat};

/// Copy posts from a JSON document into the SQLite store
///
/// Nothing is written when the database already holds posts.
pub fn run(config: &Config, from: Option<PathBuf>, output: &Output) -> Result<()> {
    let source_path = from.unwrap_or_else(|| config.posts_json_path());
    if !source_path.exists() {
        bail!("Nothing to import: {:?} does not exist", source_path);
    }

    let source = FileStore::open(&source_path)
        .with_context(|| format!("Failed to read posts from {:?}", source_path))?;
    let destination =
        SqliteStore::open(config.sqlite_path()).context("Failed to open SQLite store")?;

    let report = import_posts(&source, &destination).context("Import failed")?;
    print_report(&report, output);
    Ok(())
}

fn print_report(report: &ImportReport, output: &Output) {
    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "imported": report.imported,
                    "failed": report.failed,
                    "skipped": report.skipped
                })
            );
        }
        OutputFormat::Quiet => {}
        OutputFormat::Human => {
            if report.skipped {
                println!("Database already has posts; nothing imported.");
            } else if report.failed > 0 {
                println!(
                    "⚠ Imported {} post(s), {} failed (see log for details)",
                    report.imported, report.failed
                );
            } else {
                println!("✓ Imported {} post(s)", report.imported);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_core::{Post, PostStore};
    use tempfile::TempDir;

    #[test]
    fn test_import_from_default_location() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        let json = FileStore::open(config.posts_json_path()).unwrap();
        json.create(Post::new("first", "First")).unwrap();
        json.create(Post::new("second", "Second")).unwrap();

        let output = Output::new(OutputFormat::Quiet);
        run(&config, None, &output).unwrap();

        let sqlite = SqliteStore::open(config.sqlite_path()).unwrap();
        assert_eq!(sqlite.list().unwrap().len(), 2);

        // Second run leaves the populated database alone
        run(&config, None, &output).unwrap();
        assert_eq!(sqlite.list().unwrap().len(), 2);
    }

    #[test]
    fn test_missing_source_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };
        let output = Output::new(OutputFormat::Quiet);
        assert!(run(&config, None, &output).is_err());
    }
}
