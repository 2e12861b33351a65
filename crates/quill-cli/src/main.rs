//! Quill CLI
//!
//! Operator command-line interface for Quill - posts, site profile and
//! newsletter subscribers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use quill_core::Config;

mod commands;
mod output;
mod prompt;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "quill")]
#[command(about = "Quill - personal blog storage and administration")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log store activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (overrides QUILL_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show store status and post counts
    Status,
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Manage posts
    Post {
        #[command(subcommand)]
        command: PostCommands,
    },
    /// Site profile
    Site {
        #[command(subcommand)]
        command: Option<SiteCommands>,
    },
    /// Manage newsletter subscribers
    Subscriber {
        #[command(subcommand)]
        command: SubscriberCommands,
    },
    /// Copy posts from a JSON document into an empty SQLite store
    Import {
        /// Source document (defaults to posts.json in the data directory)
        #[arg(long)]
        from: Option<PathBuf>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
}

#[derive(Subcommand)]
enum PostCommands {
    /// List posts, newest first
    #[command(alias = "ls")]
    List {
        /// Hide drafts
        #[arg(long)]
        published: bool,
        /// Page number (1-based)
        #[arg(long)]
        page: Option<i64>,
        /// Posts per page
        #[arg(long, default_value_t = 10)]
        per_page: usize,
    },
    /// Show a single post
    Show {
        slug: String,
    },
    /// List published posts sharing tags with a post
    Related {
        slug: String,
        /// Maximum number of posts
        #[arg(short, default_value_t = 3)]
        n: usize,
    },
    /// Create a new post
    #[command(alias = "add")]
    Create {
        #[arg(long)]
        slug: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "")]
        summary: String,
        #[arg(long, default_value = "")]
        category: String,
        /// Tags (repeatable)
        #[arg(short, long)]
        tag: Vec<String>,
        /// Keep out of public listings
        #[arg(long)]
        draft: bool,
        #[arg(long)]
        featured: bool,
        /// Post body
        #[arg(long, default_value = "")]
        content: String,
    },
    /// Change fields of an existing post
    Edit {
        slug: String,
        /// Rename the post
        #[arg(long)]
        new_slug: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Replace all tags (repeatable)
        #[arg(short, long)]
        tag: Option<Vec<String>>,
        #[arg(long)]
        draft: Option<bool>,
        #[arg(long)]
        featured: Option<bool>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete a post
    #[command(alias = "rm")]
    Delete {
        slug: String,
    },
}

#[derive(Subcommand, Clone)]
enum SiteCommands {
    /// Show the site profile
    Show,
}

#[derive(Subcommand)]
enum SubscriberCommands {
    /// Subscribe an email address
    Add { email: String },
    /// Unsubscribe an email address
    #[command(alias = "rm")]
    Remove { email: String },
    /// List active subscribers
    #[command(alias = "ls")]
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config display must work even when the data directory is unusable
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    config.ensure_data_dir()?;

    match cli.command {
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Status => commands::status::show(&config, &output),
        Commands::Post { command } => handle_post_command(command, &config, &output),
        Commands::Site { command } => match command {
            Some(SiteCommands::Show) | None => commands::site::show(&config, &output),
        },
        Commands::Subscriber { command } => handle_subscriber_command(command, &config, &output),
        Commands::Import { from } => commands::import::run(&config, from, &output),
    }
}

fn handle_post_command(command: PostCommands, config: &Config, output: &Output) -> Result<()> {
    let store = quill_core::open_store(config).context("Failed to open post store")?;
    let store = store.as_ref();

    match command {
        PostCommands::List {
            published,
            page,
            per_page,
        } => commands::post::list(store, published, page, per_page, output),
        PostCommands::Show { slug } => commands::post::show(store, &slug, output),
        PostCommands::Related { slug, n } => commands::post::related(store, &slug, n, output),
        PostCommands::Create {
            slug,
            title,
            summary,
            category,
            tag,
            draft,
            featured,
            content,
        } => {
            let post = quill_core::Post {
                summary,
                category,
                tags: tag,
                is_draft: draft,
                featured,
                content,
                ..quill_core::Post::new(slug, title)
            };
            commands::post::create(store, post, output)
        }
        PostCommands::Edit {
            slug,
            new_slug,
            title,
            summary,
            category,
            tag,
            draft,
            featured,
            content,
        } => {
            let changes = commands::post::PostChanges {
                slug: new_slug,
                title,
                summary,
                category,
                tags: tag,
                is_draft: draft,
                featured,
                content,
            };
            commands::post::edit(store, &slug, changes, output)
        }
        PostCommands::Delete { slug } => commands::post::delete(store, &slug, output),
    }
}

fn handle_subscriber_command(
    command: SubscriberCommands,
    config: &Config,
    output: &Output,
) -> Result<()> {
    let store = commands::subscriber::open(config)?;

    match command {
        SubscriberCommands::Add { email } => commands::subscriber::add(&store, &email, output),
        SubscriberCommands::Remove { email } => {
            commands::subscriber::remove(&store, &email, output)
        }
        SubscriberCommands::List => commands::subscriber::list(&store, output),
    }
}

/// Log to stderr; `RUST_LOG` wins over the built-in levels
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("quill_core={},quill_cli={}", level, level)));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
