//! Per-platform size diffing of two metadata sets

use tracing::{debug, warn};

use crate::change::{SizeChange, ZeroBasePolicy};
use crate::types::AssetMeta;

/// Computes size deltas between the artifacts of two versions
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffEngine {
    zero_base: ZeroBasePolicy,
}

impl DiffEngine {
    /// Create a diff engine with the given zero-size policy
    pub fn new(zero_base: ZeroBasePolicy) -> Self {
        Self { zero_base }
    }

    /// Join `base` and `changed` on target platform and compute each delta.
    ///
    /// Output follows the order of `base`. Platforms present on only one side
    /// produce nothing.
    pub fn diff(&self, base: &[AssetMeta], changed: &[AssetMeta]) -> Vec<SizeChange> {
        let changes: Vec<SizeChange> = base
            .iter()
            .filter_map(|b| {
                let c = changed
                    .iter()
                    .find(|c| c.target_platform == b.target_platform)?;

                let change = SizeChange::between(b.clone(), c.clone(), self.zero_base);
                if change.is_none() {
                    warn!(
                        platform = %b.target_platform,
                        base_version = %b.version,
                        changed_version = %c.version,
                        "Skipping change with zero-size base artifact"
                    );
                }
                change
            })
            .collect();

        debug!(
            base_assets = base.len(),
            changed_assets = changed.len(),
            changes = changes.len(),
            "Computed size diff"
        );

        changes
    }
}
