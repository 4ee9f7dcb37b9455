//! Metadata provider abstraction
//!
//! A metadata provider answers the three questions the comparator asks: which
//! versions are tracked, what came before a version, and how large each
//! platform artifact of a version is. Implementations backed by a release
//! list share a [`ReleaseCatalog`] that fetches the list once per instance.

use async_trait::async_trait;
use chrono::Utc;
use sizewatch_core::{parse_version, AssetMeta, Release, VersionSelector};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use tokio::sync::OnceCell;
use tracing::{debug, error, instrument};

use crate::error::{ServiceError, ServiceResult};

/// Default release tracking window
pub const DEFAULT_WINDOW_DAYS: u32 = 60;

/// Source of release versions and artifact sizes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Versions to track this run, newest major line first, nightly last
    async fn latest_versions(&self) -> ServiceResult<Vec<String>>;

    /// Version released immediately before `version`, if any
    async fn previous_version(&self, version: &str) -> ServiceResult<Option<String>>;

    /// Artifact sizes of `version`, one per platform.
    ///
    /// Never fails: retrieval errors are logged and yield an empty set, which
    /// is indistinguishable from a version without published assets.
    async fn asset_metas(&self, version: &str) -> Vec<AssetMeta>;
}

/// Release list fetched lazily once and shared by the selection queries
#[derive(Debug)]
pub struct ReleaseCatalog {
    selector: VersionSelector,
    window_days: u32,
    releases: OnceCell<Vec<Release>>,
}

impl ReleaseCatalog {
    /// Create an empty catalog
    pub fn new(selector: VersionSelector, window_days: u32) -> Self {
        Self {
            selector,
            window_days,
            releases: OnceCell::new(),
        }
    }

    /// Selection rules in use
    pub fn selector(&self) -> &VersionSelector {
        &self.selector
    }

    /// Cached release list, calling `fetch` on first use only.
    ///
    /// A failed fetch is not cached; the next call tries again.
    pub async fn releases<F, Fut>(&self, fetch: F) -> ServiceResult<&[Release]>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ServiceResult<Vec<Release>>>,
    {
        self.releases
            .get_or_try_init(fetch)
            .await
            .map(|releases| releases.as_slice())
    }

    /// Tracked versions among `releases`, relative to the current time
    pub fn latest_versions(&self, releases: &[Release]) -> Vec<String> {
        self.selector
            .latest_versions(releases, self.window_days, Utc::now())
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    /// Predecessor of `version` among all `releases`
    pub fn previous_version(
        &self,
        releases: &[Release],
        version: &str,
    ) -> ServiceResult<Option<String>> {
        let version = parse_version(version)?;
        Ok(self
            .selector
            .previous_version(releases, &version)
            .map(|v| v.to_string()))
    }
}

/// In-memory provider over fixed releases and asset sizes
///
/// Used for offline runs and tests. Versions marked unavailable behave like a
/// failing upstream: the error is logged and an empty set is returned.
#[derive(Debug)]
pub struct StaticMetadataProvider {
    catalog: ReleaseCatalog,
    releases: Vec<Release>,
    assets: HashMap<String, Vec<AssetMeta>>,
    unavailable: HashSet<String>,
}

impl StaticMetadataProvider {
    /// Create a provider over `releases` tracked within `window_days`
    pub fn new(releases: Vec<Release>, window_days: u32) -> Self {
        Self {
            catalog: ReleaseCatalog::new(VersionSelector::default(), window_days),
            releases,
            assets: HashMap::new(),
            unavailable: HashSet::new(),
        }
    }

    /// Register the artifacts of a version
    pub fn with_assets(mut self, version: &str, metas: Vec<AssetMeta>) -> Self {
        self.assets.insert(normalize(version).to_string(), metas);
        self
    }

    /// Make asset lookups of `version` fail
    pub fn with_unavailable(mut self, version: &str) -> Self {
        self.unavailable.insert(normalize(version).to_string());
        self
    }

    async fn releases(&self) -> ServiceResult<&[Release]> {
        let releases = &self.releases;
        self.catalog
            .releases(move || async move { Ok(releases.clone()) })
            .await
    }
}

#[async_trait]
impl MetadataProvider for StaticMetadataProvider {
    async fn latest_versions(&self) -> ServiceResult<Vec<String>> {
        let releases = self.releases().await?;
        Ok(self.catalog.latest_versions(releases))
    }

    async fn previous_version(&self, version: &str) -> ServiceResult<Option<String>> {
        let releases = self.releases().await?;
        self.catalog.previous_version(releases, version)
    }

    #[instrument(skip(self))]
    async fn asset_metas(&self, version: &str) -> Vec<AssetMeta> {
        let key = normalize(version);

        if self.unavailable.contains(key) {
            let err = ServiceError::fetch(format!("assets of {}", version), "source unavailable");
            error!(error = %err, "Error fetching asset metadata");
            return Vec::new();
        }

        let metas = self.assets.get(key).cloned().unwrap_or_default();
        debug!(assets = metas.len(), "Resolved static asset metadata");
        metas
    }
}

fn normalize(version: &str) -> &str {
    let trimmed = version.trim();
    trimmed.strip_prefix('v').unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn release(version: &str, days_ago: i64) -> Release {
        Release::parse(version, Utc::now() - Duration::days(days_ago)).unwrap()
    }

    #[tokio::test]
    async fn test_catalog_fetches_once() {
        let catalog = ReleaseCatalog::new(VersionSelector::default(), 60);
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..3 {
            let releases = catalog
                .releases(move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![release("38.0.0", 1)])
                })
                .await
                .unwrap();
            assert_eq!(releases.len(), 1);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_catalog_retries_after_failure() {
        let catalog = ReleaseCatalog::new(VersionSelector::default(), 60);

        let failed = catalog
            .releases(|| async { Err(ServiceError::fetch("index", "HTTP 500")) })
            .await;
        assert!(failed.is_err());

        let releases = catalog
            .releases(|| async { Ok(vec![release("38.0.0", 1)]) })
            .await
            .unwrap();
        assert_eq!(releases.len(), 1);
    }

    #[tokio::test]
    async fn test_catalog_previous_version_rejects_garbage() {
        let catalog = ReleaseCatalog::new(VersionSelector::default(), 60);
        let result = catalog.previous_version(&[release("38.0.0", 1)], "not-a-version");
        assert!(matches!(result, Err(ServiceError::InvalidReleaseData(_))));
    }

    #[tokio::test]
    async fn test_static_provider_selection() {
        let provider = StaticMetadataProvider::new(
            vec![
                release("38.0.0", 1),
                release("37.2.5", 3),
                release("37.2.4", 90),
            ],
            60,
        );

        assert_eq!(
            provider.latest_versions().await.unwrap(),
            vec!["38.0.0".to_string(), "37.2.5".to_string()]
        );
        assert_eq!(
            provider.previous_version("v37.2.5").await.unwrap(),
            Some("37.2.4".to_string())
        );
        assert_eq!(provider.previous_version("37.2.4").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_static_provider_assets() {
        let provider = StaticMetadataProvider::new(vec![], 60)
            .with_assets("v38.0.0", vec![AssetMeta::new("38.0.0", "linux-x64", 10)])
            .with_unavailable("37.0.0");

        assert_eq!(provider.asset_metas("38.0.0").await.len(), 1);
        assert!(provider.asset_metas("37.0.0").await.is_empty());
        assert!(provider.asset_metas("36.0.0").await.is_empty());
    }
}
