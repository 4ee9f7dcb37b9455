//! Core domain models and decision logic for sizewatch
//!
//! This crate contains the release and asset data structures, the version
//! selection rules that decide which release pairs are compared, the size
//! diffing engine, and the fingerprints used to deduplicate notifications.
//! It performs no I/O; fetching, persistence and delivery live in the store
//! and service crates.

pub mod change;
pub mod diff;
pub mod error;
pub mod selector;
pub mod types;

// Re-exports for convenience
pub use change::{Fingerprint, SizeChange, ZeroBasePolicy};
pub use diff::DiffEngine;
pub use error::{CoreError, Result};
pub use selector::{VersionSelector, DEFAULT_NIGHTLY_MARKER};
pub use types::{canonical_version, parse_version, AssetMeta, Release};
