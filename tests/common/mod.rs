//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use sizewatch_core::SizeChange;
use sizewatch_service::{
    ComparatorConfig, MetadataProvider, NotificationChannel, ServiceError, ServiceResult,
    SizeComparator,
};
use sizewatch_store::{ChangeStore, FileChangeStore};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub mod fixtures;

/// Notification channel that keeps every batch it receives
#[derive(Default)]
pub struct RecordingNotifier {
    batches: Mutex<Vec<Vec<SizeChange>>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make subsequent reports fail after recording the attempt
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn batches(&self) -> Vec<Vec<SizeChange>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn report_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationChannel for RecordingNotifier {
    async fn report(&self, changes: &[SizeChange]) -> ServiceResult<()> {
        self.batches.lock().unwrap().push(changes.to_vec());
        if self.failing.load(Ordering::SeqCst) {
            return Err(ServiceError::Notification("channel unavailable".to_string()));
        }
        Ok(())
    }
}

/// Cache file location that survives simulated process restarts
pub struct CacheDir {
    dir: TempDir,
}

impl CacheDir {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("state").join("cache.json")
    }

    pub fn store(&self) -> Arc<dyn ChangeStore> {
        Arc::new(FileChangeStore::new(self.path()))
    }

    pub fn read(&self) -> Vec<String> {
        let raw = std::fs::read_to_string(self.path()).expect("Failed to read cache file");
        serde_json::from_str(&raw).expect("Cache file is not a JSON array")
    }
}

/// Start a "process": load the cache from disk and build a comparator
pub async fn start(
    provider: Arc<dyn MetadataProvider>,
    notifier: Arc<RecordingNotifier>,
    cache: &CacheDir,
    config: ComparatorConfig,
) -> SizeComparator {
    SizeComparator::load(provider, notifier, cache.store(), config)
        .await
        .expect("Failed to start comparator")
}

/// `(platform, changed version)` of each change, in order
pub fn summary(changes: &[SizeChange]) -> Vec<(String, String)> {
    changes
        .iter()
        .map(|c| (c.platform().to_string(), c.changed.version.clone()))
        .collect()
}
