//! Processing run orchestration
//!
//! Scanner, inspector and matching engine run strictly in sequence: one file
//! is fully decided, upload included, before the next one is inspected.

use crate::cleanup::CleanupReport;
use crate::config::{is_placeholder, IngestConfig};
use crate::engine::MatchingEngine;
use crate::inspector::{inspect, ImageDescriptor};
use crate::registry::Registry;
use crate::report::{ImageSummary, OutcomeReport};
use crate::scanner::scan;
use crate::storage::UploadGateway;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, instrument, warn};

/// Everything one invocation produced
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingRun {
    pub directory: PathBuf,
    pub descriptors: Vec<ImageDescriptor>,
    /// Files the scanner left out for their extension
    pub unsupported: usize,
    pub report: OutcomeReport,
}

impl ProcessingRun {
    pub fn summary(&self) -> ImageSummary {
        let mut summary = ImageSummary::from_descriptors(&self.descriptors);
        summary.unsupported += self.unsupported;
        summary
    }
}

/// Scan the configured directory and decide every supported file
///
/// Files that cannot be inspected are logged and left out of the run; all
/// other files end in exactly one report bucket.
#[instrument(skip_all, fields(dir = %config.directory.display(), ci = config.ci_mode))]
pub async fn run_pipeline(
    config: &IngestConfig,
    registry: &mut Registry,
    gateway: &dyn UploadGateway,
) -> ProcessingRun {
    let mut report = OutcomeReport::default();
    let files = scan(&config.directory, config, &mut report);
    let unsupported = report.skipped.len();

    let mut engine = MatchingEngine::new(registry, gateway, config);
    let mut descriptors = Vec::with_capacity(files.len());

    for path in files {
        let mut descriptor = match inspect(&path, config) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot inspect file, leaving it out");
                continue;
            }
        };

        let result = engine.process(&mut descriptor).await;
        if let Err(ref err) = result {
            debug!(
                file = %descriptor.name,
                kind = %err.kind,
                reason = %err.message,
                "Image rejected"
            );
        }

        report.record(&descriptor.name, &result);
        descriptors.push(descriptor);
    }

    info!(
        images = descriptors.len(),
        skipped = report.skipped.len(),
        failed_uploads = report.failed_upload.len(),
        completed = report.completed.len(),
        "Run finished"
    );

    ProcessingRun {
        directory: config.directory.clone(),
        descriptors,
        unsupported,
        report,
    }
}

/// Reasons the process should exit non-zero
///
/// - a file other than the placeholder artwork was skipped
/// - CI mode found no images at all
/// - cleanup could not delete every completed source file
pub fn exit_failures(
    run: &ProcessingRun,
    ci_mode: bool,
    cleanup: Option<&CleanupReport>,
) -> Vec<String> {
    let mut failures = Vec::new();

    let rejected: Vec<&str> = run
        .report
        .skipped
        .iter()
        .filter(|skipped| !is_placeholder(&skipped.name))
        .map(|skipped| skipped.name.as_str())
        .collect();
    if !rejected.is_empty() {
        failures.push(format!(
            "{} file(s) failed validation: {}",
            rejected.len(),
            rejected.join(", ")
        ));
    }

    if ci_mode && run.descriptors.is_empty() {
        failures.push("no new images found".to_string());
    }

    if let Some(cleanup) = cleanup {
        if cleanup.deletion.is_failure() {
            failures.push(format!("cleanup: {}", cleanup.deletion));
        }
    }

    failures
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::cleanup::{DeletionStatus, PersistStatus};

    fn run_with(report: OutcomeReport, descriptors: usize) -> ProcessingRun {
        let descriptor = ImageDescriptor {
            path: PathBuf::from("1.png"),
            name: "1.png".to_string(),
            code: Some("1".to_string()),
            extension: "png".to_string(),
            size_bytes: 10,
            mime_type: "image/png".to_string(),
            is_supported_format: true,
            is_valid_size: true,
            created: None,
            modified: None,
        };
        ProcessingRun {
            directory: PathBuf::from("."),
            descriptors: vec![descriptor; descriptors],
            unsupported: 0,
            report,
        }
    }

    #[test]
    fn test_clean_run_has_no_failures() {
        let mut report = OutcomeReport::default();
        report.complete("1.png", "https://cdn/logo/1");
        assert!(exit_failures(&run_with(report, 1), false, None).is_empty());
    }

    #[test]
    fn test_placeholder_skip_is_ignored() {
        let mut report = OutcomeReport::default();
        report.skip("default-image.png", "no code found");
        report.skip("abc.png", "no code found");

        let failures = exit_failures(&run_with(report, 2), false, None);
        assert_eq!(failures, vec!["1 file(s) failed validation: abc.png"]);
    }

    #[test]
    fn test_ci_mode_requires_images() {
        let run = run_with(OutcomeReport::default(), 0);
        assert_eq!(exit_failures(&run, true, None), vec!["no new images found"]);
        assert!(exit_failures(&run, false, None).is_empty());
    }

    #[test]
    fn test_partial_deletion_fails_run() {
        let cleanup = CleanupReport {
            registry: PersistStatus::Saved,
            deletion: DeletionStatus::PartialFailure {
                failed: 1,
                attempted: 2,
                failures: Vec::new(),
            },
        };
        let run = run_with(OutcomeReport::default(), 2);
        let failures = exit_failures(&run, false, Some(&cleanup));
        assert_eq!(failures, vec!["cleanup: failed to delete 1 of 2 source file(s)"]);
    }

    #[test]
    fn test_summary_counts_scanner_exclusions() {
        let mut report = OutcomeReport::default();
        report.skip("notes.txt", "unsupported format: txt");
        let mut run = run_with(report, 1);
        run.unsupported = 1;

        let summary = run.summary();
        assert_eq!(summary.total_files, 1);
        assert_eq!(summary.unsupported, 1);
    }
}
