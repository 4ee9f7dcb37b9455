//! sizewatch
//!
//! Compares release artifact sizes between consecutive versions and reports
//! significant changes once. Meant to be run periodically by a scheduler;
//! invocations sharing a change cache must not overlap.

mod config;
mod telemetry;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sizewatch_service::{
    ElectronMetadataProvider, ElectronSourceConfig, LogNotifier, MetadataProvider,
    NotificationChannel, PostgresMetadataProvider, PostgresSourceConfig, SizeComparator,
    SlackConfig, SlackNotifier,
};
use sizewatch_store::{
    ChangeStore, FileChangeStore, MemoryChangeStore, RedisChangeStore, RedisStoreConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use config::{
    CacheBackend, CacheConfig, ChannelKind, NotifyConfig, Secret, SizewatchConfig, SourceConfig,
    SourceKind,
};
use telemetry::TelemetryConfig;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration directory
    #[arg(short, long, env = "CONFIG_DIR", default_value = "config")]
    config_dir: String,

    /// Environment (development, production, etc.)
    #[arg(short, long, env = "ENVIRONMENT", default_value = "development")]
    environment: String,

    /// Minimum relative change worth reporting
    #[arg(long)]
    threshold: Option<f64>,

    /// Change cache file
    #[arg(long, env = "SIZEWATCH_CACHE_PATH")]
    cache_path: Option<PathBuf>,

    /// Release mirror database URL
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Slack bot token
    #[arg(long, env = "SLACK_TOKEN", hide_env_values = true)]
    slack_token: Option<String>,

    /// Log level
    #[arg(long, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Log reports instead of sending them and leave the change cache untouched
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
enum Command {
    /// Compare every tracked version with its predecessor and report new significant changes
    Latest,

    /// Print every size change between two versions
    Compare {
        /// Older version
        base: String,

        /// Newer version
        changed: String,

        /// Report the significant new changes as well
        #[arg(long)]
        report: bool,
    },
}

impl Command {
    /// Whether the command sends notifications
    fn reports(&self) -> bool {
        match self {
            Command::Latest => true,
            Command::Compare { report, .. } => *report,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = SizewatchConfig::load(&args.config_dir, &args.environment)
        .context("Failed to load configuration")?;
    apply_overrides(&mut config, &args);

    telemetry::init_with_config(TelemetryConfig::from(&config.logging));

    info!(
        environment = %args.environment,
        source = ?config.source.kind,
        cache = ?config.cache.backend,
        threshold = config.comparator.threshold,
        dry_run = args.dry_run,
        "Starting sizewatch"
    );

    let provider = build_provider(&config.source).await?;
    let store = build_store(&config.cache).await?;

    let (channel, store): (Arc<dyn NotificationChannel>, Arc<dyn ChangeStore>) =
        if args.dry_run || !args.command.reports() {
            (
                Arc::new(LogNotifier::new()) as Arc<dyn NotificationChannel>,
                detached_copy(store).await?,
            )
        } else {
            (build_channel(&config.notify)?, store)
        };

    let mut comparator = SizeComparator::load(provider, channel, store, config.comparator)
        .await
        .context("Failed to load change cache")?;

    let changes = match &args.command {
        Command::Latest => comparator
            .compare_latest()
            .await
            .context("Size comparison failed")?,
        Command::Compare {
            base,
            changed,
            report: false,
        } => comparator.compare(base, changed).await,
        Command::Compare {
            base,
            changed,
            report: true,
        } => comparator
            .compare_and_report(base, changed)
            .await
            .context("Size comparison failed")?,
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&changes).context("Failed to serialize changes")?
    );

    info!(changes = changes.len(), "Run complete");
    Ok(())
}

/// Fold command-line arguments into the loaded configuration
fn apply_overrides(config: &mut SizewatchConfig, args: &Args) {
    if let Some(threshold) = args.threshold {
        config.comparator.threshold = threshold;
    }
    if let Some(path) = &args.cache_path {
        config.cache.path = path.clone();
    }
    if let Some(url) = &args.database_url {
        config.source.database_url = Some(url.clone());
    }
    if let Some(token) = &args.github_token {
        config.source.github_token = Some(Secret::new(token.clone()));
    }
    if let Some(token) = &args.slack_token {
        config.notify.slack_token = Some(Secret::new(token.clone()));
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }
}

async fn build_provider(source: &SourceConfig) -> Result<Arc<dyn MetadataProvider>> {
    let timeout = Duration::from_secs(source.timeout_seconds);

    match source.kind {
        SourceKind::Electron => {
            let electron = ElectronSourceConfig {
                releases_url: source.releases_url.clone(),
                github_api_url: source.github_api_url.clone(),
                owner: source.owner.clone(),
                repo: source.repo.clone(),
                nightly_repo: source.nightly_repo.clone(),
                github_token: source.github_token.as_ref().map(|t| t.expose().to_string()),
                window_days: source.window_days,
                nightly_marker: source.nightly_marker.clone(),
                timeout,
            };
            let provider = ElectronMetadataProvider::new(electron)
                .context("Failed to create release API client")?;
            Ok(Arc::new(provider))
        }
        SourceKind::Postgres => {
            let url = source
                .database_url
                .as_deref()
                .context("source.database_url is required for the postgres source")?;

            let mut postgres = PostgresSourceConfig::new(url)
                .max_connections(source.max_connections)
                .window_days(source.window_days);
            postgres.connect_timeout = timeout;
            postgres.nightly_marker = source.nightly_marker.clone();

            let provider = PostgresMetadataProvider::connect(postgres)
                .await
                .context("Failed to connect to release database")?;
            Ok(Arc::new(provider))
        }
    }
}

async fn build_store(cache: &CacheConfig) -> Result<Arc<dyn ChangeStore>> {
    match cache.backend {
        CacheBackend::File => Ok(Arc::new(FileChangeStore::new(cache.path.clone()))),
        CacheBackend::Redis => {
            let url = cache
                .redis_url
                .as_deref()
                .context("cache.redis_url is required for the redis backend")?;

            let store = RedisChangeStore::connect(
                RedisStoreConfig::new(url).with_key(cache.redis_key.clone()),
            )
            .await
            .context("Failed to connect to Redis")?;
            Ok(Arc::new(store))
        }
    }
}

fn build_channel(notify: &NotifyConfig) -> Result<Arc<dyn NotificationChannel>> {
    match notify.channel {
        ChannelKind::Log => Ok(Arc::new(LogNotifier::new())),
        ChannelKind::Slack => {
            let token = notify
                .slack_token
                .as_ref()
                .context("notify.slack_token is required for the slack channel")?;
            let channel = notify
                .slack_channel
                .as_deref()
                .context("notify.slack_channel is required for the slack channel")?;

            let slack = SlackConfig::new(token.expose(), channel)
                .with_api_url(notify.slack_api_url.clone());
            let notifier = SlackNotifier::new(slack).context("Invalid Slack configuration")?;
            Ok(Arc::new(notifier))
        }
    }
}

/// In-memory copy of `store`, so that nothing this run records is persisted
async fn detached_copy(store: Arc<dyn ChangeStore>) -> Result<Arc<dyn ChangeStore>> {
    let entries = store
        .load()
        .await
        .with_context(|| format!("Failed to read change cache at {}", store.location()))?;

    Ok(Arc::new(match entries {
        Some(entries) => MemoryChangeStore::with_entries(entries),
        None => MemoryChangeStore::new(),
    }))
}
