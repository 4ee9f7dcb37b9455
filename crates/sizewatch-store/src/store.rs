//! Change store trait abstraction
//!
//! A change store is the durable location of the dedup cache: an ordered
//! sequence of opaque fingerprint strings, read in full once and rewritten in
//! full on every mutation.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::StoreResult;

/// Durable backing storage of a [`ChangeCache`](crate::ChangeCache)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChangeStore: Send + Sync {
    /// Read every persisted fingerprint.
    ///
    /// Returns `Ok(None)` when nothing has been persisted yet and an error
    /// when the stored content cannot be read or parsed.
    async fn load(&self) -> StoreResult<Option<Vec<String>>>;

    /// Replace the stored content with `fingerprints`
    async fn save(&self, fingerprints: &[String]) -> StoreResult<()>;

    /// Human-readable location, used in logs
    fn location(&self) -> String;
}

/// In-process store
///
/// Clones share the same buffer, so a clone outlives the cache that wrote to
/// it and can seed a fresh cache the way a restarted process would.
#[derive(Debug, Clone, Default)]
pub struct MemoryChangeStore {
    entries: Arc<Mutex<Option<Vec<String>>>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryChangeStore {
    /// Create an empty store that reports itself as never written
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding previously persisted fingerprints
    pub fn with_entries(entries: Vec<String>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Some(entries))),
            writes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Current persisted content
    pub async fn snapshot(&self) -> Option<Vec<String>> {
        self.entries.lock().await.clone()
    }

    /// Number of `save` calls so far
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChangeStore for MemoryChangeStore {
    async fn load(&self) -> StoreResult<Option<Vec<String>>> {
        Ok(self.entries.lock().await.clone())
    }

    async fn save(&self, fingerprints: &[String]) -> StoreResult<()> {
        *self.entries.lock().await = Some(fingerprints.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
