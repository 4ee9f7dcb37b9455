//! Release selection
//!
//! Decides which versions are tracked on each run and which older version
//! each of them is compared against.

use chrono::{DateTime, Duration, Utc};
use semver::Version;
use std::collections::BTreeSet;
use tracing::debug;

use crate::types::Release;

/// Prerelease identifier marking automated nightly builds
pub const DEFAULT_NIGHTLY_MARKER: &str = "nightly";

/// Picks tracked versions and their predecessors from a release list
#[derive(Debug, Clone)]
pub struct VersionSelector {
    nightly_marker: String,
}

impl Default for VersionSelector {
    fn default() -> Self {
        Self::new(DEFAULT_NIGHTLY_MARKER)
    }
}

impl VersionSelector {
    /// Create a selector recognising nightlies by the given prerelease marker
    pub fn new(nightly_marker: impl Into<String>) -> Self {
        Self {
            nightly_marker: nightly_marker.into(),
        }
    }

    /// Whether the version is a nightly build: its first prerelease
    /// identifier equals the nightly marker and a build identifier follows,
    /// as in `39.0.0-nightly.20250805`.
    pub fn is_nightly(&self, version: &Version) -> bool {
        let mut identifiers = version.pre.as_str().split('.');
        identifiers.next() == Some(self.nightly_marker.as_str()) && identifiers.next().is_some()
    }

    /// Versions worth tracking among releases published in the last `window_days`.
    ///
    /// Yields the newest non-nightly version of every major line, in
    /// descending major order, followed by the newest nightly if one exists.
    /// A prerelease newer than every other version of its line is tracked in
    /// place of the older stable release.
    pub fn latest_versions(
        &self,
        releases: &[Release],
        window_days: u32,
        now: DateTime<Utc>,
    ) -> Vec<Version> {
        let cutoff = now - Duration::days(i64::from(window_days));

        let mut versions: Vec<&Version> = releases
            .iter()
            .filter(|r| r.published_at > cutoff)
            .map(|r| &r.version)
            .collect();
        versions.sort_by(|a, b| b.cmp(a));
        versions.dedup();

        let mut majors = BTreeSet::new();
        let mut latest: Vec<Version> = versions
            .iter()
            .filter(|v| !self.is_nightly(v))
            .filter(|v| majors.insert(v.major))
            .map(|v| (*v).clone())
            .collect();

        if let Some(nightly) = versions.iter().find(|v| self.is_nightly(v)) {
            latest.push((*nightly).clone());
        }

        debug!(
            eligible = versions.len(),
            tracked = latest.len(),
            window_days,
            "Selected latest versions"
        );

        latest
    }

    /// The version released immediately before `version`, over all releases
    /// regardless of publication date.
    pub fn previous_version(&self, releases: &[Release], version: &Version) -> Option<Version> {
        let mut versions: Vec<&Version> = releases.iter().map(|r| &r.version).collect();
        versions.sort();
        versions.dedup();

        let index = versions.iter().position(|v| *v == version)?;
        index.checked_sub(1).map(|i| versions[i].clone())
    }
}
