//! Size changes and their deduplication fingerprints

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::types::{canonical_version, AssetMeta};

/// How a delta is treated when the base artifact has size zero
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZeroBasePolicy {
    /// Any change from zero is infinitely significant
    Significant,
    /// Drop the change and log a warning
    Skip,
}

impl Default for ZeroBasePolicy {
    fn default() -> Self {
        Self::Significant
    }
}

impl fmt::Display for ZeroBasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Significant => write!(f, "significant"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

impl FromStr for ZeroBasePolicy {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "significant" => Ok(Self::Significant),
            "skip" => Ok(Self::Skip),
            _ => Err(CoreError::SerializationError(format!(
                "Invalid zero base policy: {}",
                s
            ))),
        }
    }
}

/// Size delta of one platform between two versions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizeChange {
    /// Artifact of the older version
    pub base: AssetMeta,

    /// Artifact of the newer version, same platform as `base`
    pub changed: AssetMeta,

    /// `changed.size_in_bytes - base.size_in_bytes`
    pub absolute: i64,

    /// `absolute / base.size_in_bytes`
    pub relative: f64,
}

impl SizeChange {
    /// Compute the change between two artifacts of the same platform.
    ///
    /// Returns `None` when the base size is zero and `policy` is [`ZeroBasePolicy::Skip`].
    pub fn between(base: AssetMeta, changed: AssetMeta, policy: ZeroBasePolicy) -> Option<Self> {
        debug_assert_eq!(base.target_platform, changed.target_platform);

        let delta = i128::from(changed.size_in_bytes) - i128::from(base.size_in_bytes);
        // Saturates for deltas beyond i64; the relative value stays exact.
        let absolute = i64::try_from(delta).unwrap_or(if delta > 0 { i64::MAX } else { i64::MIN });
        let relative = if base.size_in_bytes == 0 {
            match policy {
                ZeroBasePolicy::Skip => return None,
                ZeroBasePolicy::Significant if delta > 0 => f64::INFINITY,
                ZeroBasePolicy::Significant => 0.0,
            }
        } else {
            delta as f64 / base.size_in_bytes as f64
        };

        Some(Self {
            base,
            changed,
            absolute,
            relative,
        })
    }

    /// Target platform shared by both sides of the change
    pub fn platform(&self) -> &str {
        &self.base.target_platform
    }

    /// Whether the relative delta strictly exceeds `threshold` in magnitude
    pub fn exceeds(&self, threshold: f64) -> bool {
        self.relative.abs() > threshold
    }

    /// Deduplication key for this change
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}

/// Field layout hashed into a fingerprint.
///
/// Fields are serialized in declaration order, so the encoding does not
/// depend on how the change was assembled. Versions are hashed in
/// canonical form, so `v38.0.0` and `38.0.0` collide.
#[derive(Serialize)]
struct FingerprintFields<'a> {
    base_size: u64,
    base_version: &'a str,
    changed_size: u64,
    changed_version: &'a str,
    platform: &'a str,
}

/// Deterministic identity of a [`SizeChange`], used as the dedup cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint of a change
    pub fn of(change: &SizeChange) -> Self {
        let base_version = canonical_version(&change.base.version);
        let changed_version = canonical_version(&change.changed.version);
        let fields = FingerprintFields {
            base_size: change.base.size_in_bytes,
            base_version: &base_version,
            changed_size: change.changed.size_in_bytes,
            changed_version: &changed_version,
            platform: &change.base.target_platform,
        };

        let mut hasher = Sha256::new();
        // Serializing a struct of strings and integers cannot fail.
        hasher.update(serde_json::to_vec(&fields).unwrap_or_default());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Wrap a previously persisted fingerprint
    pub fn from_persisted(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// String form stored in the cache
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
