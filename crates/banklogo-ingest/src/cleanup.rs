//! End-of-run cleanup
//!
//! Two independent steps run once after processing: the registry is written
//! back with placeholder icons filled in, and the source file of every
//! completed image is removed from the logo directory. A failure in one step
//! does not prevent the other.

use crate::registry::Registry;
use crate::report::CompletedImage;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};

/// Result of the registry write
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum PersistStatus {
    Saved,
    Failed(String),
}

/// Result of deleting completed source files
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeletionStatus {
    /// No completed images, nothing attempted
    NothingToDelete,
    Deleted { count: usize },
    PartialFailure {
        failed: usize,
        attempted: usize,
        failures: Vec<DeletionFailure>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionFailure {
    pub name: String,
    pub error: String,
}

impl DeletionStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, DeletionStatus::PartialFailure { .. })
    }
}

impl std::fmt::Display for DeletionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeletionStatus::NothingToDelete => write!(f, "no completed images to delete"),
            DeletionStatus::Deleted { count } => write!(f, "deleted {} source file(s)", count),
            DeletionStatus::PartialFailure {
                failed, attempted, ..
            } => write!(f, "failed to delete {} of {} source file(s)", failed, attempted),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub registry: PersistStatus,
    pub deletion: DeletionStatus,
}

impl CleanupReport {
    pub fn is_success(&self) -> bool {
        self.registry == PersistStatus::Saved && !self.deletion.is_failure()
    }
}

/// Write the registry to `path`, filling `placeholder` where no icon is set
pub fn persist_registry(registry: &Registry, path: &Path, placeholder: &str) -> PersistStatus {
    match registry.save(path, placeholder) {
        Ok(()) => PersistStatus::Saved,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to save registry");
            PersistStatus::Failed(e.to_string())
        }
    }
}

/// Delete `dir/<name>` for every completed image
///
/// Keeps going past individual failures and reports how many failed.
pub fn delete_completed(dir: &Path, completed: &[CompletedImage]) -> DeletionStatus {
    if completed.is_empty() {
        info!("No completed images, nothing to delete");
        return DeletionStatus::NothingToDelete;
    }

    let mut failures = Vec::new();

    for image in completed {
        let path = dir.join(&image.name);
        match std::fs::remove_file(&path) {
            Ok(()) => info!(file = %image.name, "Source file deleted"),
            Err(e) => {
                warn!(file = %image.name, error = %e, "Failed to delete source file");
                failures.push(DeletionFailure {
                    name: image.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    if failures.is_empty() {
        DeletionStatus::Deleted {
            count: completed.len(),
        }
    } else {
        DeletionStatus::PartialFailure {
            failed: failures.len(),
            attempted: completed.len(),
            failures,
        }
    }
}

/// Run both cleanup steps
pub fn run_cleanup(
    registry: &Registry,
    registry_path: &Path,
    placeholder: &str,
    dir: &Path,
    completed: &[CompletedImage],
) -> CleanupReport {
    let registry_status = persist_registry(registry, registry_path, placeholder);
    let deletion = delete_completed(dir, completed);

    CleanupReport {
        registry: registry_status,
        deletion,
    }
}
