//! Notification channels
//!
//! A channel receives one batch of significant size changes per report. The
//! comparator never calls a channel with an empty batch.

use async_trait::async_trait;
use sizewatch_core::SizeChange;
use tracing::{info, instrument};

use crate::error::ServiceResult;

/// Destination for size change reports
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Deliver a batch of changes, sorted by relative change descending
    async fn report(&self, changes: &[SizeChange]) -> ServiceResult<()>;
}

/// Channel that writes each change to the log
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

impl LogNotifier {
    /// Create a log notifier
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationChannel for LogNotifier {
    #[instrument(skip(self, changes), fields(changes = changes.len()))]
    async fn report(&self, changes: &[SizeChange]) -> ServiceResult<()> {
        for change in changes {
            info!(
                platform = %change.platform(),
                base_version = %change.base.version,
                changed_version = %change.changed.version,
                absolute = change.absolute,
                relative = change.relative,
                "{}",
                describe_change(change)
            );
        }
        Ok(())
    }
}

/// One-line human readable summary of a change
pub fn describe_change(change: &SizeChange) -> String {
    format!(
        "{}: {} -> {} ({} -> {}, {} / {})",
        change.platform(),
        change.base.version,
        change.changed.version,
        format_bytes(change.base.size_in_bytes),
        format_bytes(change.changed.size_in_bytes),
        format_signed_bytes(change.absolute),
        format_percent(change.relative)
    )
}

/// Size in decimal megabytes
pub fn format_bytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1_000_000.0)
}

/// Signed size delta in decimal megabytes
pub fn format_signed_bytes(delta: i64) -> String {
    let sign = if delta >= 0 { "+" } else { "-" };
    format!("{}{}", sign, format_bytes(delta.unsigned_abs()))
}

/// Signed percentage; unbounded changes from a zero base render as `new`
pub fn format_percent(relative: f64) -> String {
    if relative.is_infinite() {
        return "new".to_string();
    }
    format!("{:+.2}%", relative * 100.0)
}
