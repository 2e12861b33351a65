//! Storage layer
//!
//! Persistence primitives and the two post store backends.
//!
//! ## Architecture
//!
//! - **JSON file**: whole collection in memory, rewritten atomically on every mutation
//! - **SQLite**: `posts` and `subscribers` tables in WAL mode
//!
//! Both backends implement [`crate::store::PostStore`].

pub mod atomic;
pub mod error;
pub mod file_store;
pub mod schema;
pub mod sqlite_store;

pub use atomic::atomic_write;
pub use error::{StorageError, StorageResult};
pub use file_store::FileStore;
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
pub use sqlite_store::SqliteStore;
