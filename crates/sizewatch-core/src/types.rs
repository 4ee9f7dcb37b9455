//! Core type definitions

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CoreError, Result};

/// Parse a release version string, accepting an optional leading `v`.
pub fn parse_version(input: &str) -> Result<Version> {
    let trimmed = input.trim();
    let raw = trimmed.strip_prefix('v').unwrap_or(trimmed);

    Version::parse(raw).map_err(|e| CoreError::InvalidVersion {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Canonical string form of a version identifier.
///
/// Strips a leading `v` from anything that parses as a version and
/// leaves other identifiers untouched apart from surrounding whitespace.
pub fn canonical_version(input: &str) -> String {
    parse_version(input)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| input.trim().to_string())
}

/// A published release of the tracked software
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Semantic version of the release
    pub version: Version,

    /// When the release was published
    pub published_at: DateTime<Utc>,
}

impl Release {
    /// Create a new release
    pub fn new(version: Version, published_at: DateTime<Utc>) -> Self {
        Self {
            version,
            published_at,
        }
    }

    /// Create a release from a raw version string
    pub fn parse(version: &str, published_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self::new(parse_version(version)?, published_at))
    }
}

/// Size of one distribution artifact of a version for one target platform
///
/// A metadata set holds at most one entry per (version, platform) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetMeta {
    /// Version identifier as reported by the metadata provider
    pub version: String,

    /// Operating-system/architecture identifier, e.g. `darwin-arm64`
    pub target_platform: String,

    /// Artifact size in bytes
    pub size_in_bytes: u64,
}

impl AssetMeta {
    /// Create a new asset metadata entry
    pub fn new(
        version: impl Into<String>,
        target_platform: impl Into<String>,
        size_in_bytes: u64,
    ) -> Self {
        Self {
            version: version.into(),
            target_platform: target_platform.into(),
            size_in_bytes,
        }
    }
}

impl fmt::Display for AssetMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} ({} bytes)",
            self.target_platform, self.version, self.size_in_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_strips_prefix() {
        let version = parse_version("v38.0.0").unwrap();
        assert_eq!(version, Version::new(38, 0, 0));
    }

    #[test]
    fn test_parse_version_prerelease() {
        let version = parse_version("39.0.0-nightly.20250805").unwrap();
        assert_eq!(version.pre.as_str(), "nightly.20250805");
    }

    #[test]
    fn test_parse_version_rejects_garbage() {
        let err = parse_version("latest").unwrap_err();
        assert!(matches!(err, CoreError::InvalidVersion { .. }));
    }

    #[test]
    fn test_canonical_version() {
        assert_eq!(canonical_version("v38.0.0"), "38.0.0");
        assert_eq!(canonical_version(" 38.0.0 "), "38.0.0");
        assert_eq!(
            canonical_version("v39.0.0-nightly.20250805"),
            "39.0.0-nightly.20250805"
        );
        assert_eq!(canonical_version("latest"), "latest");
    }

    #[test]
    fn test_asset_meta_display() {
        let meta = AssetMeta::new("38.0.0", "linux-x64", 1024);
        assert_eq!(meta.to_string(), "linux-x64@38.0.0 (1024 bytes)");
    }
}
