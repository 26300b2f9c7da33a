//! Bank Logo Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging setup for the bank logo tooling.
//!
//! # Overview
//!
//! - **Error Handling**: [`LogoError`] and the [`Result`] alias
//! - **Logging**: [`logging::init_logging`] configures the global `tracing` subscriber
//!
//! # Example
//!
//! ```no_run
//! use banklogo_common::logging::{init_logging, LogConfig};
//!
//! fn start() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

pub use error::{LogoError, Result};
