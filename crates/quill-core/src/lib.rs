//! Quill Core Library
//!
//! Persistence and admin-session plumbing for Quill, a personal blog with a
//! public site and a password-protected admin surface.
//!
//! # Architecture
//!
//! - **PostStore**: one contract, two interchangeable backends (a JSON
//!   document rewritten atomically, or an embedded SQLite database)
//! - **SiteStore**: the single site profile record, kept as JSON
//! - **SessionRegistry / AdminGate**: in-memory sessions with per-session
//!   CSRF tokens guarding the admin surface
//!
//! # Quick Start
//!
//! ```text
//! let config = Config::load()?;
//! let store = open_store(&config)?;
//!
//! store.create(Post::new("hello-world", "Hello, world").with_tags(["intro"]))?;
//!
//! let (page, total) = store.list_published_paginated(1, 10)?;
//! let related = store.get_related("hello-world", 3)?;
//! ```
//!
//! # Modules
//!
//! - `store`: Post store contract, backend factory and JSON import
//! - `storage`: Atomic writer, JSON file store, SQLite store and schema
//! - `query`: Ordering, pagination and related-post ranking
//! - `models`: Posts, site profile and subscribers
//! - `site`: Site profile store
//! - `session`: Session registry, CSRF tokens and cookies
//! - `gate`: Admin request gate
//! - `config`: Application configuration

pub mod config;
pub mod gate;
pub mod models;
pub mod query;
pub mod session;
pub mod site;
pub mod storage;
pub mod store;

pub use config::{Config, StoreBackend};
pub use gate::{AdminGate, GateDecision, GateRequest, Method};
pub use models::{Post, SiteProfile, SocialLink, Subscriber};
pub use session::{AuthError, Credentials, SessionCookie, SessionRegistry};
pub use site::SiteStore;
pub use storage::{FileStore, SqliteStore, StorageError};
pub use store::{import_posts, open_store, ImportReport, PostStore, StoreError, StoreResult};
