//! GME Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Synchronizes geophysical index data into a record store.
//!
//! # Supported Data Sources
//!
//! - **Dst / AE**: WDC for Geomagnetism, Kyoto (IAGA-2002 via the request form)
//! - **Kp**: GFZ Potsdam yearly WDC files over FTP
//! - **Omni**: NASA SPDF 1-minute and 5-minute high-resolution files over FTP
//! - **POES**: NOAA averaged particle data, daily files per satellite
//! - **TEC**: Madrigal GPS total electron content
//!
//! Each source runs as its own [`job::SyncJob`], one year at a time, and every
//! decoded record is upserted by natural key through the
//! [`reconcile::Reconciler`]. The [`orchestrator::Orchestrator`] runs all jobs
//! concurrently and gathers a [`orchestrator::RunSummary`].
//!
//! # Example
//!
//! ```no_run
//! use gme_ingest::config::IngestConfig;
//! use gme_ingest::orchestrator::{Orchestrator, SyncMode};
//! use gme_ingest::registry;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::from_env()?;
//!     let store = registry::open_store(&config).await?;
//!     let orchestrator = Orchestrator::new(registry::build_sources(&config)?, store);
//!     let summary = orchestrator.run(SyncMode::Incremental).await?;
//!     println!("{} inserted, {} updated", summary.inserted(), summary.updated());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod decode;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod query;
pub mod reconcile;
pub mod record;
pub mod registry;
pub mod source;
pub mod store;

pub use error::{IngestError, Result};
pub use orchestrator::{Orchestrator, RunContext, RunSummary, SyncMode};
pub use record::{Dataset, IndexRecord, NaturalKey};
