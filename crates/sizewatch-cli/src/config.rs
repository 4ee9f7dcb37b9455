//! Runtime configuration
//!
//! Configuration is layered, later sources overriding earlier ones:
//! - Default configuration file
//! - Environment-specific configuration file
//! - Environment variables
//! - Command-line arguments

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use sizewatch_service::ComparatorConfig;
use std::fmt;
use std::path::PathBuf;

/// Credential that never shows up in debug output
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// Wrap a credential
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw credential
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SizewatchConfig {
    /// Significance threshold and policies
    #[serde(default)]
    pub comparator: ComparatorConfig,

    /// Where release metadata comes from
    #[serde(default)]
    pub source: SourceConfig,

    /// Where reported changes are remembered
    #[serde(default)]
    pub cache: CacheConfig,

    /// Where reports are sent
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Release index and GitHub releases
    #[default]
    Electron,
    /// Release mirror database
    Postgres,
}

/// Metadata source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Provider to use
    #[serde(default)]
    pub kind: SourceKind,

    /// Tracking window in days
    #[serde(default = "default_window_days")]
    pub window_days: u32,

    /// Prerelease marker of nightly builds
    #[serde(default = "default_nightly_marker")]
    pub nightly_marker: String,

    /// Release index URL
    #[serde(default = "default_releases_url")]
    pub releases_url: String,

    /// GitHub API base URL
    #[serde(default = "default_github_api_url")]
    pub github_api_url: String,

    /// Repository owner
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Repository of stable and prerelease builds
    #[serde(default = "default_repo")]
    pub repo: String,

    /// Repository of nightly builds
    #[serde(default = "default_nightly_repo")]
    pub nightly_repo: String,

    /// GitHub token
    #[serde(default)]
    pub github_token: Option<Secret>,

    /// Release mirror database URL
    #[serde(default)]
    pub database_url: Option<String>,

    /// Maximum database connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Request and connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_window_days() -> u32 {
    sizewatch_service::DEFAULT_WINDOW_DAYS
}

fn default_nightly_marker() -> String {
    sizewatch_core::DEFAULT_NIGHTLY_MARKER.to_string()
}

fn default_releases_url() -> String {
    sizewatch_service::electron::DEFAULT_RELEASES_URL.to_string()
}

fn default_github_api_url() -> String {
    sizewatch_service::electron::DEFAULT_GITHUB_API_URL.to_string()
}

fn default_owner() -> String {
    "electron".to_string()
}

fn default_repo() -> String {
    "electron".to_string()
}

fn default_nightly_repo() -> String {
    "nightlies".to_string()
}

fn default_max_connections() -> u32 {
    sizewatch_service::postgres::DEFAULT_MAX_CONNECTIONS
}

fn default_timeout() -> u64 {
    30
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            window_days: default_window_days(),
            nightly_marker: default_nightly_marker(),
            releases_url: default_releases_url(),
            github_api_url: default_github_api_url(),
            owner: default_owner(),
            repo: default_repo(),
            nightly_repo: default_nightly_repo(),
            github_token: None,
            database_url: None,
            max_connections: default_max_connections(),
            timeout_seconds: default_timeout(),
        }
    }
}

/// Change store selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    /// JSON array in a local file
    #[default]
    File,
    /// JSON array under a Redis key
    Redis,
}

/// Change cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Store to use
    #[serde(default)]
    pub backend: CacheBackend,

    /// Cache file path
    #[serde(default = "default_cache_path")]
    pub path: PathBuf,

    /// Redis connection URL
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Redis key holding the fingerprints
    #[serde(default = "default_redis_key")]
    pub redis_key: String,
}

fn default_cache_path() -> PathBuf {
    PathBuf::from(sizewatch_store::DEFAULT_CACHE_FILE)
}

fn default_redis_key() -> String {
    sizewatch_store::DEFAULT_REDIS_KEY.to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            path: default_cache_path(),
            redis_url: None,
            redis_key: default_redis_key(),
        }
    }
}

/// Notification channel selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Slack Web API
    Slack,
    /// Application log only
    #[default]
    Log,
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Channel to use
    #[serde(default)]
    pub channel: ChannelKind,

    /// Slack Web API base URL
    #[serde(default = "default_slack_api_url")]
    pub slack_api_url: String,

    /// Slack bot token
    #[serde(default)]
    pub slack_token: Option<Secret>,

    /// Slack channel to post to
    #[serde(default)]
    pub slack_channel: Option<String>,
}

fn default_slack_api_url() -> String {
    sizewatch_service::slack::DEFAULT_SLACK_API_URL.to_string()
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            channel: ChannelKind::default(),
            slack_api_url: default_slack_api_url(),
            slack_token: None,
            slack_channel: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON formatting
    #[serde(default)]
    pub json_format: bool,

    /// Include thread IDs
    #[serde(default)]
    pub include_thread_ids: bool,

    /// Include target module
    #[serde(default = "default_true")]
    pub include_target: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            include_thread_ids: false,
            include_target: true,
        }
    }
}

impl SizewatchConfig {
    /// Load configuration from files and environment
    ///
    /// Configuration is loaded in the following order (later sources override earlier):
    /// 1. Default configuration file (config/default.toml)
    /// 2. Environment-specific file (config/{env}.toml)
    /// 3. Environment variables (SIZEWATCH_*)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or parsed
    pub fn load(config_dir: impl Into<PathBuf>, environment: &str) -> Result<Self, ConfigError> {
        let config_dir = config_dir.into();

        let config = Config::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", environment))).required(false),
            )
            // e.g., SIZEWATCH_COMPARATOR__THRESHOLD=0.1
            .add_source(
                Environment::with_prefix("SIZEWATCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
