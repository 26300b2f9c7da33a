//! Outcome aggregation and reporting
//!
//! Every image ends in exactly one bucket: skipped (with a reason),
//! failed upload, or completed. [`ImageSummary`] is a read-only projection
//! over the descriptors of a run.

use crate::engine::{ProcessingErrorKind, ProcessingResult};
use crate::inspector::ImageDescriptor;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedImage {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedUpload {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedImage {
    pub name: String,
    pub icon: String,
}

/// Per-run outcome buckets, each in encounter order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeReport {
    pub skipped: Vec<SkippedImage>,
    pub failed_upload: Vec<FailedUpload>,
    pub completed: Vec<CompletedImage>,
}

impl OutcomeReport {
    pub fn skip(&mut self, name: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedImage {
            name: name.into(),
            reason: reason.into(),
        });
    }

    pub fn fail_upload(&mut self, name: impl Into<String>) {
        self.failed_upload.push(FailedUpload { name: name.into() });
    }

    pub fn complete(&mut self, name: impl Into<String>, icon: impl Into<String>) {
        self.completed.push(CompletedImage {
            name: name.into(),
            icon: icon.into(),
        });
    }

    /// Route an engine result into its bucket
    pub fn record(&mut self, name: &str, result: &ProcessingResult) {
        match result {
            Ok(icon) => self.complete(name, icon.as_str()),
            Err(err) => match err.kind {
                ProcessingErrorKind::Validation | ProcessingErrorKind::Match => {
                    self.skip(name, err.message.as_str())
                }
                ProcessingErrorKind::Upload => self.fail_upload(name),
            },
        }
    }

    pub fn total(&self) -> usize {
        self.skipped.len() + self.failed_upload.len() + self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Names of completed images, in order
    pub fn completed_names(&self) -> Vec<&str> {
        self.completed.iter().map(|c| c.name.as_str()).collect()
    }
}

impl fmt::Display for OutcomeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Skipped ({}):", self.skipped.len())?;
        for skipped in &self.skipped {
            writeln!(f, "  - {}: {}", skipped.name, skipped.reason)?;
        }

        writeln!(f, "Failed uploads ({}):", self.failed_upload.len())?;
        for failed in &self.failed_upload {
            writeln!(f, "  - {}", failed.name)?;
        }

        writeln!(f, "Completed ({}):", self.completed.len())?;
        for completed in &self.completed {
            writeln!(f, "  - {} -> {}", completed.name, completed.icon)?;
        }

        Ok(())
    }
}

/// Size and format statistics over the descriptors of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImageSummary {
    pub total_files: usize,
    pub by_mime_type: BTreeMap<String, usize>,
    pub total_size: u64,
    pub average_size: u64,
    pub largest: Option<SizedFile>,
    pub smallest: Option<SizedFile>,
    pub unsupported: usize,
    pub invalid_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SizedFile {
    pub name: String,
    pub size_bytes: u64,
}

impl ImageSummary {
    pub fn from_descriptors(descriptors: &[ImageDescriptor]) -> Self {
        let mut summary = Self {
            total_files: descriptors.len(),
            ..Self::default()
        };

        for descriptor in descriptors {
            *summary
                .by_mime_type
                .entry(descriptor.mime_type.clone())
                .or_default() += 1;
            summary.total_size += descriptor.size_bytes;

            if !descriptor.is_supported_format {
                summary.unsupported += 1;
            }
            if !descriptor.is_valid_size {
                summary.invalid_size += 1;
            }

            let sized = || SizedFile {
                name: descriptor.name.clone(),
                size_bytes: descriptor.size_bytes,
            };
            // ties keep the first file seen
            if summary.largest.as_ref().is_none_or(|l| descriptor.size_bytes > l.size_bytes) {
                summary.largest = Some(sized());
            }
            if summary.smallest.as_ref().is_none_or(|s| descriptor.size_bytes < s.size_bytes) {
                summary.smallest = Some(sized());
            }
        }

        if !descriptors.is_empty() {
            summary.average_size = summary.total_size / descriptors.len() as u64;
        }

        summary
    }
}

impl fmt::Display for ImageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Images inspected: {}", self.total_files)?;
        if self.total_files == 0 {
            if self.unsupported > 0 {
                writeln!(f, "  Unsupported:  {}", self.unsupported)?;
            }
            return Ok(());
        }

        let mut types = String::new();
        for (i, (mime, count)) in self.by_mime_type.iter().enumerate() {
            if i > 0 {
                types.push_str(", ");
            }
            write!(types, "{} x{}", mime, count)?;
        }
        writeln!(f, "  Types:        {}", types)?;
        writeln!(f, "  Total size:   {}", format_bytes(self.total_size))?;
        writeln!(f, "  Average size: {}", format_bytes(self.average_size))?;
        if let Some(ref largest) = self.largest {
            let size = format_bytes(largest.size_bytes);
            writeln!(f, "  Largest:      {} ({})", largest.name, size)?;
        }
        if let Some(ref smallest) = self.smallest {
            let size = format_bytes(smallest.size_bytes);
            writeln!(f, "  Smallest:     {} ({})", smallest.name, size)?;
        }
        writeln!(f, "  Unsupported:  {}", self.unsupported)?;
        writeln!(f, "  Invalid size: {}", self.invalid_size)?;

        Ok(())
    }
}

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
