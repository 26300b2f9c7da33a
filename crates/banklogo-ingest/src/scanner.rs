//! Directory scanning
//!
//! Lists the candidate directory in the order the file system returns entries
//! and splits regular files into supported and unsupported by extension.

use crate::config::IngestConfig;
use crate::inspector::extension_of;
use crate::report::OutcomeReport;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Skip reason for a file whose extension is not in the allow-list
pub fn unsupported_reason(extension: &str) -> String {
    if extension.is_empty() {
        "unsupported format: (none)".to_string()
    } else {
        format!("unsupported format: {}", extension)
    }
}

/// Scan `dir` and return supported files in directory-entry order
///
/// Unsupported files are recorded as skipped in `report`. Subdirectories and
/// other non-regular entries are ignored. A directory that cannot be read is
/// logged and yields no files.
pub fn scan(dir: &Path, config: &IngestConfig, report: &mut OutcomeReport) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            error!(dir = %dir.display(), error = %e, "Cannot read logo directory");
            return Vec::new();
        }
    };

    let mut files = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Cannot read directory entry");
                continue;
            }
        };

        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }

        let path = entry.path();
        let extension = extension_of(&path);

        if config.is_supported_extension(&extension) {
            files.push(path);
        } else {
            let name = entry.file_name().to_string_lossy().into_owned();
            debug!(file = %name, extension = %extension, "Unsupported format");
            report.skip(name, unsupported_reason(&extension));
        }
    }

    debug!(dir = %dir.display(), supported = files.len(), "Directory scanned");

    files
}
