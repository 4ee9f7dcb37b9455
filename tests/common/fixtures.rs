//! Test fixtures
//!
//! A release history with four tracked lines:
//!
//! | tracked                 | predecessor             | notable changes                |
//! |-------------------------|-------------------------|--------------------------------|
//! | 38.0.0                  | 38.0.0-alpha.1          | darwin-arm64 +5%, win32-arm64 -11% |
//! | 37.2.5                  | 37.2.4                  | linux-x64 +6%                  |
//! | 36.7.3                  | 36.7.2                  | assets unavailable             |
//! | 39.0.0-nightly.20250805 | 39.0.0-nightly.20250804 | darwin-arm64 +20%              |

use chrono::{Duration, Utc};
use sizewatch_core::{AssetMeta, Release};
use sizewatch_service::StaticMetadataProvider;

pub const MB: u64 = 1_000_000;

pub const NIGHTLY: &str = "39.0.0-nightly.20250805";
pub const PREVIOUS_NIGHTLY: &str = "39.0.0-nightly.20250804";

/// Release published `days_ago` days before now
pub fn release(version: &str, days_ago: i64) -> Release {
    Release::parse(version, Utc::now() - Duration::days(days_ago)).unwrap()
}

/// Artifact sizes in megabytes per platform
pub fn metas(version: &str, sizes: &[(&str, u64)]) -> Vec<AssetMeta> {
    sizes
        .iter()
        .map(|(platform, mb)| AssetMeta::new(version, *platform, mb * MB))
        .collect()
}

pub fn releases() -> Vec<Release> {
    vec![
        release("38.0.0", 2),
        release("38.0.0-alpha.1", 20),
        release("37.2.5", 5),
        release("37.2.4", 90),
        release("36.7.3", 9),
        release("36.7.2", 100),
        release(NIGHTLY, 1),
        release(PREVIOUS_NIGHTLY, 2),
    ]
}

/// Provider over [`releases`] with the sizes described above
pub fn release_history() -> StaticMetadataProvider {
    StaticMetadataProvider::new(releases(), 60)
        .with_assets(
            "38.0.0-alpha.1",
            metas(
                "38.0.0-alpha.1",
                &[
                    ("darwin-arm64", 100),
                    ("win32-x64", 120),
                    ("linux-x64", 110),
                    ("win32-arm64", 100),
                ],
            ),
        )
        .with_assets(
            "38.0.0",
            metas(
                "38.0.0",
                &[
                    ("darwin-arm64", 105),
                    ("win32-x64", 121),
                    ("linux-x64", 109),
                    ("win32-arm64", 89),
                ],
            ),
        )
        .with_assets(
            "37.2.4",
            metas("37.2.4", &[("linux-x64", 100), ("darwin-x64", 90)]),
        )
        .with_assets(
            "37.2.5",
            metas("37.2.5", &[("linux-x64", 106), ("darwin-x64", 90)]),
        )
        .with_assets("36.7.2", metas("36.7.2", &[("linux-x64", 100)]))
        .with_unavailable("36.7.3")
        .with_assets(
            PREVIOUS_NIGHTLY,
            metas(PREVIOUS_NIGHTLY, &[("darwin-arm64", 100)]),
        )
        .with_assets(
            NIGHTLY,
            metas(NIGHTLY, &[("darwin-arm64", 120), ("linux-arm64", 95)]),
        )
}
