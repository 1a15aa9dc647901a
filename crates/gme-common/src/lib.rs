//! GME Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the GME index sync workspace.
//!
//! - **Error Handling**: [`GmeError`] and the [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by `GME_LOG_*` variables
//!
//! # Example
//!
//! ```no_run
//! use gme_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     tracing::info!("sync starting");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

pub use error::{GmeError, Result};
