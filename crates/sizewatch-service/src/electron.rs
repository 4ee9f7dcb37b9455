//! Release-API backed metadata provider
//!
//! Releases come from the Electron headers index (`version` and `date` per
//! entry). Artifact sizes come from the GitHub releases API; nightly builds
//! are published to a separate repository.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use regex::Regex;
use semver::Version;
use serde::Deserialize;
use sizewatch_core::{parse_version, AssetMeta, Release, VersionSelector};
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

use crate::error::{ServiceError, ServiceResult};
use crate::provider::{MetadataProvider, ReleaseCatalog, DEFAULT_WINDOW_DAYS};

/// Default release index location
pub const DEFAULT_RELEASES_URL: &str = "https://electronjs.org/headers/index.json";

/// Default GitHub API base URL
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Distribution zip names: version, os, arch and an optional variant suffix
/// (`symbols`, `dsym`, `pdb`, ...). Only unsuffixed archives are tracked.
const ASSET_PATTERN: &str = r"^electron-(v[0-9]+\.[0-9]+\.[0-9]+(?:-(?:alpha|beta|nightly)\.[0-9]+)?)-(.+?)-(.+?)(?:-(.+?))?\.zip$";

/// Electron provider configuration
#[derive(Clone)]
pub struct ElectronSourceConfig {
    /// Release index URL
    pub releases_url: String,

    /// GitHub API base URL
    pub github_api_url: String,

    /// Repository owner
    pub owner: String,

    /// Repository holding stable and prerelease builds
    pub repo: String,

    /// Repository holding nightly builds
    pub nightly_repo: String,

    /// Optional GitHub token for higher rate limits
    pub github_token: Option<String>,

    /// Only releases published within this many days are tracked
    pub window_days: u32,

    /// Prerelease marker of nightly builds
    pub nightly_marker: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ElectronSourceConfig {
    fn default() -> Self {
        Self {
            releases_url: DEFAULT_RELEASES_URL.to_string(),
            github_api_url: DEFAULT_GITHUB_API_URL.to_string(),
            owner: "electron".to_string(),
            repo: "electron".to_string(),
            nightly_repo: "nightlies".to_string(),
            github_token: None,
            window_days: DEFAULT_WINDOW_DAYS,
            nightly_marker: sizewatch_core::DEFAULT_NIGHTLY_MARKER.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl fmt::Debug for ElectronSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElectronSourceConfig")
            .field("releases_url", &self.releases_url)
            .field("github_api_url", &self.github_api_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("nightly_repo", &self.nightly_repo)
            .field("github_token", &self.github_token.as_ref().map(|_| "***"))
            .field("window_days", &self.window_days)
            .field("nightly_marker", &self.nightly_marker)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ElectronSourceConfig {
    /// Set the release index URL
    pub fn with_releases_url(mut self, url: impl Into<String>) -> Self {
        self.releases_url = url.into();
        self
    }

    /// Set the GitHub API base URL
    pub fn with_github_api_url(mut self, url: impl Into<String>) -> Self {
        self.github_api_url = url.into();
        self
    }

    /// Set the GitHub token
    pub fn with_github_token(mut self, token: impl Into<String>) -> Self {
        self.github_token = Some(token.into());
        self
    }

    /// Set the tracking window
    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }
}

/// One entry of the release index
#[derive(Debug, Deserialize)]
struct IndexEntry {
    version: String,
    date: String,
}

#[derive(Debug, Deserialize)]
struct GithubRelease {
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: String,
    size: u64,
}

/// Metadata provider backed by the Electron release index and GitHub releases
pub struct ElectronMetadataProvider {
    client: reqwest::Client,
    config: ElectronSourceConfig,
    catalog: ReleaseCatalog,
    asset_pattern: Regex,
}

impl ElectronMetadataProvider {
    /// Create a new provider
    pub fn new(config: ElectronSourceConfig) -> ServiceResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("sizewatch/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServiceError::Configuration(format!("HTTP client: {}", e)))?;

        let selector = VersionSelector::new(config.nightly_marker.clone());
        let catalog = ReleaseCatalog::new(selector, config.window_days);

        Ok(Self {
            client,
            config,
            catalog,
            asset_pattern: Regex::new(ASSET_PATTERN)?,
        })
    }

    async fn releases(&self) -> ServiceResult<&[Release]> {
        self.catalog.releases(|| self.fetch_releases()).await
    }

    #[instrument(skip(self), fields(url = %self.config.releases_url))]
    async fn fetch_releases(&self) -> ServiceResult<Vec<Release>> {
        let entries: Vec<IndexEntry> = self
            .client
            .get(&self.config.releases_url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ServiceError::fetch("release index", e))?
            .json()
            .await
            .map_err(|e| ServiceError::fetch("release index", e))?;

        let releases = entries
            .into_iter()
            .map(|entry| -> ServiceResult<Release> {
                let published_at = parse_release_date(&entry.date)?;
                Ok(Release::parse(&entry.version, published_at)?)
            })
            .collect::<ServiceResult<Vec<_>>>()?;

        info!(releases = releases.len(), "Fetched release index");
        Ok(releases)
    }

    fn release_url(&self, version: &Version) -> String {
        let repo = if self.catalog.selector().is_nightly(version) {
            &self.config.nightly_repo
        } else {
            &self.config.repo
        };

        format!(
            "{}/repos/{}/{}/releases/tags/v{}",
            self.config.github_api_url.trim_end_matches('/'),
            self.config.owner,
            repo,
            version
        )
    }

    async fn fetch_asset_metas(&self, version: &str) -> ServiceResult<Vec<AssetMeta>> {
        let version = parse_version(version)?;
        let url = self.release_url(&version);
        let version = version.to_string();
        debug!(%url, "Fetching release assets");

        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.config.github_token {
            request = request.bearer_auth(token);
        }

        let release: GithubRelease = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ServiceError::fetch(url.clone(), e))?
            .json()
            .await
            .map_err(|e| ServiceError::fetch(url.clone(), e))?;

        Ok(release
            .assets
            .iter()
            .filter_map(|asset| {
                let platform = self.platform_of(&asset.name)?;
                Some(AssetMeta::new(version.as_str(), platform, asset.size))
            })
            .collect())
    }

    /// `{os}-{arch}` of a distribution archive, `None` for anything else
    fn platform_of(&self, asset_name: &str) -> Option<String> {
        let captures = self.asset_pattern.captures(asset_name)?;
        if captures.get(4).is_some() {
            return None;
        }
        Some(format!("{}-{}", &captures[2], &captures[3]))
    }
}

#[async_trait]
impl MetadataProvider for ElectronMetadataProvider {
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
        match self.fetch_asset_metas(version).await {
            Ok(metas) => {
                debug!(assets = metas.len(), "Fetched asset metadata");
                metas
            }
            Err(e) => {
                error!(error = %e, "Error fetching asset metadata");
                Vec::new()
            }
        }
    }
}

/// Parse an index date, either `YYYY-MM-DD` or RFC 3339
fn parse_release_date(raw: &str) -> ServiceResult<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }

    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ServiceError::InvalidReleaseData(format!("release date '{}': {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn days_ago(days: i64) -> String {
        (Utc::now() - ChronoDuration::days(days))
            .format("%Y-%m-%d")
            .to_string()
    }

    fn provider_for(server: &MockServer) -> ElectronMetadataProvider {
        let config = ElectronSourceConfig::default()
            .with_releases_url(format!("{}/headers/index.json", server.uri()))
            .with_github_api_url(server.uri());
        ElectronMetadataProvider::new(config).unwrap()
    }

    async fn mount_index(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/headers/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "version": "39.0.0-nightly.20250805", "date": days_ago(1) },
                { "version": "38.0.0", "date": days_ago(2) },
                { "version": "38.0.0-alpha.1", "date": days_ago(20) },
                { "version": "37.2.5", "date": days_ago(5) },
                { "version": "36.7.3", "date": days_ago(9) },
                { "version": "35.0.0", "date": days_ago(200) },
            ])))
            .expect(1)
            .mount(server)
            .await;
    }

    fn github_release(version: &str) -> serde_json::Value {
        json!({
            "tag_name": format!("v{}", version),
            "assets": [
                { "name": format!("electron-v{}-darwin-arm64.zip", version), "size": 100000000u64 },
                { "name": format!("electron-v{}-darwin-x64.zip", version), "size": 110000000u64 },
                { "name": format!("electron-v{}-win32-x64.zip", version), "size": 120000000u64 },
                { "name": format!("electron-v{}-linux-x64.zip", version), "size": 105000000u64 },
                { "name": format!("electron-v{}-darwin-arm64-symbols.zip", version), "size": 1u64 },
                { "name": format!("electron-v{}-win32-x64-pdb.zip", version), "size": 1u64 },
                { "name": format!("chromedriver-v{}-linux-x64.zip", version), "size": 1u64 },
                { "name": "SHASUMS256.txt", "size": 1u64 },
            ]
        })
    }

    #[tokio::test]
    async fn test_latest_versions_from_index() {
        let server = MockServer::start().await;
        mount_index(&server).await;
        let provider = provider_for(&server);

        let latest = provider.latest_versions().await.unwrap();
        assert_eq!(
            latest,
            vec!["38.0.0", "37.2.5", "36.7.3", "39.0.0-nightly.20250805"]
        );
        assert!(!latest.contains(&"38.0.0-alpha.1".to_string()));
    }

    #[tokio::test]
    async fn test_latest_versions_with_narrow_window() {
        let server = MockServer::start().await;
        mount_index(&server).await;
        let config = ElectronSourceConfig::default()
            .with_releases_url(format!("{}/headers/index.json", server.uri()))
            .with_window_days(6);
        let provider = ElectronMetadataProvider::new(config).unwrap();

        assert_eq!(
            provider.latest_versions().await.unwrap(),
            vec!["38.0.0", "37.2.5", "39.0.0-nightly.20250805"]
        );
    }

    #[tokio::test]
    async fn test_previous_version_ignores_window() {
        let server = MockServer::start().await;
        mount_index(&server).await;
        let provider = provider_for(&server);

        assert_eq!(
            provider.previous_version("38.0.0").await.unwrap(),
            Some("38.0.0-alpha.1".to_string())
        );
        assert_eq!(
            provider.previous_version("36.7.3").await.unwrap(),
            Some("35.0.0".to_string())
        );
        assert_eq!(provider.previous_version("35.0.0").await.unwrap(), None);
        assert_eq!(provider.previous_version("40.0.0").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_index_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/headers/index.json"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = provider_for(&server).latest_versions().await;
        assert!(matches!(result, Err(ServiceError::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_unparsable_index_version_fails_fast() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/headers/index.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "version": "banana", "date": days_ago(1) },
            ])))
            .mount(&server)
            .await;

        let result = provider_for(&server).latest_versions().await;
        assert!(matches!(result, Err(ServiceError::InvalidReleaseData(_))));
    }

    #[tokio::test]
    async fn test_asset_metas_filters_distribution_archives() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/electron/electron/releases/tags/v38.0.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(github_release("38.0.0")))
            .mount(&server)
            .await;
        let provider = provider_for(&server);

        for version in ["38.0.0", "v38.0.0"] {
            let metas = provider.asset_metas(version).await;
            let platforms: Vec<&str> = metas.iter().map(|m| m.target_platform.as_str()).collect();
            assert_eq!(
                platforms,
                vec!["darwin-arm64", "darwin-x64", "win32-x64", "linux-x64"]
            );
            assert!(metas.iter().all(|m| m.version == "38.0.0"));
        }

        let metas = provider.asset_metas("38.0.0").await;
        assert_eq!(metas[0].size_in_bytes, 100000000);
        assert_eq!(metas[2].size_in_bytes, 120000000);
        assert_eq!(metas[0].version, "38.0.0");
    }

    #[tokio::test]
    async fn test_nightly_assets_come_from_nightly_repo() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/repos/electron/nightlies/releases/tags/v39.0.0-nightly.20250805",
            ))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(github_release("39.0.0-nightly.20250805")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let metas = provider_for(&server)
            .asset_metas("39.0.0-nightly.20250805")
            .await;
        assert_eq!(metas.len(), 4);
    }

    #[tokio::test]
    async fn test_asset_metas_sends_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/electron/electron/releases/tags/v38.0.0"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(github_release("38.0.0")))
            .expect(1)
            .mount(&server)
            .await;

        let config = ElectronSourceConfig::default()
            .with_github_api_url(server.uri())
            .with_github_token("secret-token");
        let provider = ElectronMetadataProvider::new(config).unwrap();

        assert_eq!(provider.asset_metas("38.0.0").await.len(), 4);
    }

    #[tokio::test]
    async fn test_asset_metas_degrades_to_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        assert!(provider_for(&server).asset_metas("38.0.0").await.is_empty());
    }

    #[test]
    fn test_config_debug_hides_token() {
        let config = ElectronSourceConfig::default().with_github_token("secret-token");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("secret-token"));
    }

    #[test]
    fn test_parse_release_date() {
        let date = parse_release_date("2025-08-05").unwrap();
        assert_eq!(date.format("%Y-%m-%d").to_string(), "2025-08-05");

        assert!(parse_release_date("2025-08-05T10:00:00Z").is_ok());
        assert!(parse_release_date("yesterday").is_err());
    }
}
