//! Dedup cache of reported size changes
//!
//! The cache is loaded once per process and then consulted and extended
//! in memory; every newly recorded fingerprint rewrites the whole store.
//!
//! There is no concurrency control. Two processes sharing one store can lose
//! each other's writes, so invocations must be serialized by the scheduler.

use sizewatch_core::Fingerprint;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::error::StoreResult;
use crate::store::ChangeStore;

/// Set of fingerprints of changes that were already reported
pub struct ChangeCache {
    store: Arc<dyn ChangeStore>,
    entries: Vec<String>,
    index: HashSet<String>,
}

impl ChangeCache {
    /// Load the full persisted set from `store`.
    ///
    /// A store that was never written yields an empty cache. Unreadable or
    /// corrupt content is returned as an error.
    #[instrument(skip(store), fields(location = %store.location()))]
    pub async fn load(store: Arc<dyn ChangeStore>) -> StoreResult<Self> {
        let persisted = store.load().await?;

        let mut cache = Self {
            store,
            entries: Vec::new(),
            index: HashSet::new(),
        };

        match persisted {
            Some(entries) => {
                for entry in entries {
                    if cache.index.insert(entry.clone()) {
                        cache.entries.push(entry);
                    }
                }
                info!(entries = cache.entries.len(), "Loaded change cache");
            }
            None => info!("No change cache persisted yet, starting empty"),
        }

        Ok(cache)
    }

    /// Whether the change was already reported
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.index.contains(fingerprint.as_str())
    }

    /// Mark a change as reported and persist the whole set.
    ///
    /// Recording a known fingerprint is a no-op. When persisting fails the
    /// fingerprint is not kept in memory either.
    pub async fn record(&mut self, fingerprint: &Fingerprint) -> StoreResult<()> {
        if self.contains(fingerprint) {
            debug!(%fingerprint, "Fingerprint already recorded");
            return Ok(());
        }

        self.entries.push(fingerprint.as_str().to_string());

        if let Err(e) = self.store.save(&self.entries).await {
            self.entries.pop();
            return Err(e);
        }

        self.index.insert(fingerprint.as_str().to_string());
        debug!(%fingerprint, entries = self.entries.len(), "Recorded fingerprint");
        Ok(())
    }

    /// Fingerprints in insertion order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Number of recorded fingerprints
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::file::FileChangeStore;
    use crate::store::{MemoryChangeStore, MockChangeStore};
    use tempfile::TempDir;

    fn fp(raw: &str) -> Fingerprint {
        Fingerprint::from_persisted(raw)
    }

    #[tokio::test]
    async fn test_missing_store_is_empty() {
        let cache = ChangeCache::load(Arc::new(MemoryChangeStore::new()))
            .await
            .unwrap();
        assert!(cache.is_empty());
        assert!(!cache.contains(&fp("nonexistent")));
    }

    #[tokio::test]
    async fn test_loads_existing_entries() {
        let store = MemoryChangeStore::with_entries(vec![
            "key1".to_string(),
            "key2".to_string(),
            "key1".to_string(),
        ]);
        let cache = ChangeCache::load(Arc::new(store)).await.unwrap();

        assert!(cache.contains(&fp("key1")));
        assert!(cache.contains(&fp("key2")));
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_record_rewrites_store() {
        let store = MemoryChangeStore::new();
        let mut cache = ChangeCache::load(Arc::new(store.clone())).await.unwrap();

        cache.record(&fp("a")).await.unwrap();
        cache.record(&fp("b")).await.unwrap();

        assert_eq!(
            store.snapshot().await,
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_record_is_idempotent() {
        let store = MemoryChangeStore::new();
        let mut cache = ChangeCache::load(Arc::new(store.clone())).await.unwrap();

        cache.record(&fp("a")).await.unwrap();
        cache.record(&fp("a")).await.unwrap();

        assert_eq!(cache.entries(), &["a".to_string()]);
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_store_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "not json").unwrap();

        let result = ChangeCache::load(Arc::new(FileChangeStore::new(path))).await;
        assert!(matches!(result, Err(StoreError::Corrupt { .. })));
    }

    #[tokio::test]
    async fn test_failed_save_is_not_kept() {
        let mut store = MockChangeStore::new();
        store.expect_location().return_const("mock".to_string());
        store.expect_load().returning(|| Ok(None));
        store
            .expect_save()
            .times(1)
            .returning(|_| Err(StoreError::Io("disk full".to_string())));

        let mut cache = ChangeCache::load(Arc::new(store)).await.unwrap();

        assert!(cache.record(&fp("a")).await.is_err());
        assert!(!cache.contains(&fp("a")));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_survives_reload_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.json");

        let mut cache = ChangeCache::load(Arc::new(FileChangeStore::new(&path)))
            .await
            .unwrap();
        cache.record(&fp("persisted-key1")).await.unwrap();
        cache.record(&fp("persisted-key2")).await.unwrap();
        drop(cache);

        let mut reloaded = ChangeCache::load(Arc::new(FileChangeStore::new(&path)))
            .await
            .unwrap();
        assert!(reloaded.contains(&fp("persisted-key1")));
        reloaded.record(&fp("new-key")).await.unwrap();

        assert_eq!(
            reloaded.entries(),
            &[
                "persisted-key1".to_string(),
                "persisted-key2".to_string(),
                "new-key".to_string()
            ]
        );
    }
}
