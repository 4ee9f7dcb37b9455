//! Persistence layer for sizewatch
//!
//! This crate owns the dedup cache that guarantees a size change is reported
//! at most once across process restarts:
//! - [`ChangeCache`]: in-memory fingerprint set loaded once per run
//! - [`ChangeStore`]: trait over the durable location of that set
//! - [`FileChangeStore`]: JSON array in a local file
//! - [`RedisChangeStore`]: JSON array under a single Redis key
//! - [`MemoryChangeStore`]: shared in-process buffer for tests and dry runs
//!
//! Every store is read in full at startup and rewritten in full on each
//! mutation. That is fine at the expected volume of a few hundred entries;
//! a growing store would call for an append-only log with compaction.
//!
//! # Example
//!
//! ```rust,no_run
//! use sizewatch_store::{ChangeCache, FileChangeStore};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(FileChangeStore::new(".cache"));
//! let cache = ChangeCache::load(store).await?;
//! println!("{} changes already reported", cache.len());
//! # Ok(())
//! # }
//! ```

// Re-export core domain types for convenience
pub use sizewatch_core;

// Public modules
pub mod cache;
pub mod error;
pub mod file;
pub mod redis_store;
pub mod store;

// Re-exports for convenience
pub use cache::ChangeCache;
pub use error::{StoreError, StoreResult};
pub use file::{FileChangeStore, DEFAULT_CACHE_FILE};
pub use redis_store::{RedisChangeStore, RedisStoreConfig, DEFAULT_REDIS_KEY};
pub use store::{ChangeStore, MemoryChangeStore};
