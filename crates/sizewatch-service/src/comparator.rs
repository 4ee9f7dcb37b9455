//! Size comparison pipeline
//!
//! [`SizeComparator`] pairs every tracked version with its predecessor,
//! diffs their artifacts, keeps the significant unreported changes and sends
//! them as a single batch.
//!
//! # Delivery
//!
//! With the default [`DeliveryPolicy::AtMostOnce`] a batch is recorded in the
//! change cache even when the channel fails to deliver it. A failed report is
//! therefore lost rather than repeated on the next run. Operators that prefer
//! duplicate alerts over silent loss select [`DeliveryPolicy::AtLeastOnce`].
//! Either way the delivery error is returned to the caller.

use serde::{Deserialize, Serialize};
use sizewatch_core::{DiffEngine, SizeChange, ZeroBasePolicy};
use sizewatch_store::{ChangeCache, ChangeStore};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::notify::NotificationChannel;
use crate::provider::MetadataProvider;

/// Default minimum relative change worth reporting
pub const DEFAULT_THRESHOLD: f64 = 0.04;

/// Whether a batch counts as reported before or after delivery succeeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryPolicy {
    /// Record the batch whatever the delivery outcome
    #[default]
    AtMostOnce,
    /// Record the batch only once the channel accepted it
    AtLeastOnce,
}

impl fmt::Display for DeliveryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtMostOnce => write!(f, "at_most_once"),
            Self::AtLeastOnce => write!(f, "at_least_once"),
        }
    }
}

impl FromStr for DeliveryPolicy {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "at_most_once" => Ok(Self::AtMostOnce),
            "at_least_once" => Ok(Self::AtLeastOnce),
            _ => Err(ServiceError::Configuration(format!(
                "Invalid delivery policy: {}",
                s
            ))),
        }
    }
}

/// Comparator configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparatorConfig {
    /// Changes must strictly exceed this relative magnitude
    pub threshold: f64,

    /// Handling of zero-sized base artifacts
    pub zero_base: ZeroBasePolicy,

    /// When a batch is recorded as reported
    pub delivery: DeliveryPolicy,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            zero_base: ZeroBasePolicy::default(),
            delivery: DeliveryPolicy::default(),
        }
    }
}

impl ComparatorConfig {
    /// Set the significance threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the zero base policy
    pub fn with_zero_base(mut self, policy: ZeroBasePolicy) -> Self {
        self.zero_base = policy;
        self
    }

    /// Set the delivery policy
    pub fn with_delivery(mut self, policy: DeliveryPolicy) -> Self {
        self.delivery = policy;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ServiceResult<()> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(ServiceError::Configuration(format!(
                "threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Step of a comparison run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    Selecting,
    Fetching,
    Diffing,
    Filtering,
    Reporting,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Selecting => "selecting",
            Self::Fetching => "fetching",
            Self::Diffing => "diffing",
            Self::Filtering => "filtering",
            Self::Reporting => "reporting",
        };
        f.write_str(name)
    }
}

/// Orchestrates selection, diffing, filtering and reporting
pub struct SizeComparator {
    provider: Arc<dyn MetadataProvider>,
    channel: Arc<dyn NotificationChannel>,
    cache: ChangeCache,
    engine: DiffEngine,
    config: ComparatorConfig,
    phase: RunPhase,
}

impl SizeComparator {
    /// Create a comparator over an already loaded cache
    pub fn new(
        provider: Arc<dyn MetadataProvider>,
        channel: Arc<dyn NotificationChannel>,
        cache: ChangeCache,
        config: ComparatorConfig,
    ) -> ServiceResult<Self> {
        config.validate()?;

        Ok(Self {
            provider,
            channel,
            cache,
            engine: DiffEngine::new(config.zero_base),
            config,
            phase: RunPhase::Idle,
        })
    }

    /// Load the change cache from `store` and create a comparator.
    ///
    /// Fails when the store holds content that cannot be read back.
    pub async fn load(
        provider: Arc<dyn MetadataProvider>,
        channel: Arc<dyn NotificationChannel>,
        store: Arc<dyn ChangeStore>,
        config: ComparatorConfig,
    ) -> ServiceResult<Self> {
        let cache = ChangeCache::load(store).await?;
        Self::new(provider, channel, cache, config)
    }

    /// Current step of the run in progress
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Change cache in use
    pub fn cache(&self) -> &ChangeCache {
        &self.cache
    }

    /// Every change between two versions, unfiltered and unreported
    #[instrument(skip(self))]
    pub async fn compare(&self, base: &str, changed: &str) -> Vec<SizeChange> {
        let base_metas = self.provider.asset_metas(base).await;
        let changed_metas = self.provider.asset_metas(changed).await;
        self.engine.diff(&base_metas, &changed_metas)
    }

    /// Compare one version pair and report its significant new changes
    #[instrument(skip(self))]
    pub async fn compare_and_report(
        &mut self,
        base: &str,
        changed: &str,
    ) -> ServiceResult<Vec<SizeChange>> {
        self.enter(RunPhase::Fetching);
        let changes = self.compare(base, changed).await;
        let result = self.filter_and_report(changes).await;
        self.enter(RunPhase::Idle);
        result
    }

    /// Compare every tracked version with its predecessor and report the
    /// significant new changes as one batch.
    ///
    /// Returns the reported batch, empty when nothing qualified.
    #[instrument(skip(self))]
    pub async fn compare_latest(&mut self) -> ServiceResult<Vec<SizeChange>> {
        let result = self.run_latest().await;
        self.enter(RunPhase::Idle);
        result
    }

    async fn run_latest(&mut self) -> ServiceResult<Vec<SizeChange>> {
        self.enter(RunPhase::Selecting);
        let tracked = self.provider.latest_versions().await?;
        info!(versions = ?tracked, "Tracking versions");

        let mut changes = Vec::new();
        for version in &tracked {
            let Some(previous) = self.provider.previous_version(version).await? else {
                info!(%version, "No previous version, skipping");
                continue;
            };

            self.enter(RunPhase::Fetching);
            let base_metas = self.provider.asset_metas(&previous).await;
            let changed_metas = self.provider.asset_metas(version).await;

            self.enter(RunPhase::Diffing);
            let pair = self.engine.diff(&base_metas, &changed_metas);
            debug!(base = %previous, changed = %version, changes = pair.len(), "Compared version pair");
            changes.extend(pair);
        }

        self.filter_and_report(changes).await
    }

    async fn filter_and_report(
        &mut self,
        changes: Vec<SizeChange>,
    ) -> ServiceResult<Vec<SizeChange>> {
        self.enter(RunPhase::Filtering);
        let total = changes.len();
        let batch = self.select_unreported(changes);
        info!(total, significant = batch.len(), "Filtered size changes");

        if batch.is_empty() {
            return Ok(batch);
        }

        self.enter(RunPhase::Reporting);
        self.deliver(&batch).await?;
        Ok(batch)
    }

    /// Significant changes not reported before, most grown first
    fn select_unreported(&self, changes: Vec<SizeChange>) -> Vec<SizeChange> {
        let mut seen = HashSet::new();
        let mut batch: Vec<SizeChange> = changes
            .into_iter()
            .filter(|change| change.exceeds(self.config.threshold))
            .filter(|change| {
                let fingerprint = change.fingerprint();
                !self.cache.contains(&fingerprint) && seen.insert(fingerprint)
            })
            .collect();

        batch.sort_by(|a, b| b.relative.total_cmp(&a.relative));
        batch
    }

    async fn deliver(&mut self, batch: &[SizeChange]) -> ServiceResult<()> {
        let delivery = self.channel.report(batch).await;

        match (&delivery, self.config.delivery) {
            (Ok(()), _) => self.record_all(batch).await?,
            (Err(e), DeliveryPolicy::AtMostOnce) => {
                warn!(error = %e, changes = batch.len(), "Report failed, batch marked as reported anyway");
                self.record_all(batch).await?;
            }
            (Err(e), DeliveryPolicy::AtLeastOnce) => {
                warn!(error = %e, changes = batch.len(), "Report failed, batch left for the next run");
            }
        }

        delivery
    }

    async fn record_all(&mut self, batch: &[SizeChange]) -> ServiceResult<()> {
        for change in batch {
            self.cache.record(&change.fingerprint()).await?;
        }
        debug!(entries = self.cache.len(), "Recorded reported changes");
        Ok(())
    }

    fn enter(&mut self, phase: RunPhase) {
        debug!(from = %self.phase, to = %phase, "Run phase");
        self.phase = phase;
    }
}
