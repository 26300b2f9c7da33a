//! Bank Logo Ingest Library
//!
//! Validates a directory of `<code>.<ext>` bank logo files, matches each one
//! to an institution in the registry and publishes new logos to object
//! storage.
//!
//! # Overview
//!
//! - **Scanning**: [`scanner::scan`] lists the directory and skips unsupported formats
//! - **Inspection**: [`inspector::inspect`] builds an [`inspector::ImageDescriptor`]
//! - **Matching**: [`engine::MatchingEngine`] applies the validation rules and uploads
//! - **Reporting**: [`report::OutcomeReport`] and [`report::ImageSummary`]
//! - **Cleanup**: [`cleanup::run_cleanup`] saves the registry and removes published files

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod cleanup;
pub mod config;
pub mod engine;
pub mod inspector;
pub mod pipeline;
pub mod registry;
pub mod report;
pub mod scanner;
pub mod storage;

pub use config::IngestConfig;
pub use engine::{MatchingEngine, ProcessingError, ProcessingErrorKind};
pub use pipeline::{run_pipeline, ProcessingRun};
pub use registry::{InstitutionRecord, Registry};

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Validate bank logos and publish new ones to object storage
#[derive(Parser, Debug)]
#[command(name = "banklogo-ingest")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory of `<code>.<ext>` logo files
    #[arg(short, long, env = "LOGO_DIR")]
    pub dir: Option<PathBuf>,

    /// Institution registry JSON
    #[arg(short, long, env = "BANKS_JSON_PATH")]
    pub registry: Option<PathBuf>,

    /// Validate and match only; no uploads, no registry write, no deletions
    ///
    /// Also enabled when the CI environment variable is `true`, `1` or `yes`.
    #[arg(long)]
    pub ci: bool,

    /// Report output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

impl Cli {
    /// Apply command-line overrides on top of the environment configuration
    pub fn apply(&self, config: &mut IngestConfig) {
        if let Some(ref dir) = self.dir {
            config.directory = dir.clone();
        }
        if let Some(ref registry) = self.registry {
            config.registry_path = registry.clone();
        }
        if self.ci {
            config.ci_mode = true;
        }
    }
}
