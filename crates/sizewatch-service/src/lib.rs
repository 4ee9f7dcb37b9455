//! Service layer for sizewatch
//!
//! This crate wires the core comparison logic to its collaborators:
//!
//! - **MetadataProvider**: release versions and artifact sizes
//!   ([`ElectronMetadataProvider`], [`PostgresMetadataProvider`],
//!   [`StaticMetadataProvider`])
//! - **NotificationChannel**: where significant changes are sent
//!   ([`SlackNotifier`], [`LogNotifier`])
//! - **SizeComparator**: the selection, diff, filter and report pipeline
//!
//! # Example
//!
//! ```rust,no_run
//! use sizewatch_service::{
//!     ComparatorConfig, ElectronMetadataProvider, ElectronSourceConfig, LogNotifier,
//!     SizeComparator,
//! };
//! use sizewatch_store::FileChangeStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(ElectronMetadataProvider::new(ElectronSourceConfig::default())?);
//! let store = Arc::new(FileChangeStore::new(".cache"));
//!
//! let mut comparator = SizeComparator::load(
//!     provider,
//!     Arc::new(LogNotifier::new()),
//!     store,
//!     ComparatorConfig::default(),
//! )
//! .await?;
//!
//! let reported = comparator.compare_latest().await?;
//! println!("{} changes reported", reported.len());
//! # Ok(())
//! # }
//! ```

pub mod comparator;
pub mod electron;
pub mod error;
pub mod notify;
pub mod postgres;
pub mod provider;
pub mod slack;

pub use comparator::{
    ComparatorConfig, DeliveryPolicy, RunPhase, SizeComparator, DEFAULT_THRESHOLD,
};
pub use electron::{ElectronMetadataProvider, ElectronSourceConfig};
pub use error::{ServiceError, ServiceResult};
pub use notify::{LogNotifier, NotificationChannel};
pub use postgres::{mask_database_url, PostgresMetadataProvider, PostgresSourceConfig};
pub use provider::{MetadataProvider, ReleaseCatalog, StaticMetadataProvider, DEFAULT_WINDOW_DAYS};
pub use slack::{SlackConfig, SlackNotifier};
