//! File inspection
//!
//! Turns a path into an [`ImageDescriptor`]: name, extension, size, the
//! institution code carried in the file name, and the format and size
//! verdicts the matching engine acts on. Image content is never decoded.

use crate::config::{is_placeholder, IngestConfig};
use banklogo_common::{LogoError, Result};
use chrono::{DateTime, Utc};
use mime::Mime;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// MIME type recorded for extensions missing from the lookup table
pub const UNKNOWN_MIME: &str = "unknown";

/// Normalized metadata for one candidate image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageDescriptor {
    pub path: PathBuf,
    /// File name including extension, e.g. `058.png`
    pub name: String,
    /// Numeric code from the file name; replaced by the canonical NIP code
    /// once the image is matched
    pub code: Option<String>,
    /// Lowercase extension without the dot, empty when the name has none
    pub extension: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub is_supported_format: bool,
    pub is_valid_size: bool,
    pub created: Option<DateTime<Utc>>,
    pub modified: Option<DateTime<Utc>>,
}

impl ImageDescriptor {
    /// The placeholder artwork itself rather than an institution logo
    pub fn is_placeholder(&self) -> bool {
        is_placeholder(&self.name)
    }
}

/// Size window a descriptor is checked against, both bounds inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    pub min: u64,
    pub max: u64,
}

impl SizeLimits {
    pub fn contains(&self, size: u64) -> bool {
        self.min <= size && size <= self.max
    }
}

impl From<&IngestConfig> for SizeLimits {
    fn from(config: &IngestConfig) -> Self {
        Self {
            min: config.min_file_size,
            max: config.max_file_size,
        }
    }
}

/// Code embedded in a file name: the stem, if it is a non-negative integer
///
/// Leading zeros are kept, so `"058.png"` yields `"058"`.
pub fn extract_code(file_name: &str) -> Option<String> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    if !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit()) {
        Some(stem.to_string())
    } else {
        None
    }
}

/// Lowercase extension of a path without the dot
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default()
}

/// MIME type for a known image extension
pub fn mime_for_extension(extension: &str) -> Option<Mime> {
    match extension.to_lowercase().as_str() {
        "jpg" | "jpeg" => Some(mime::IMAGE_JPEG),
        "png" => Some(mime::IMAGE_PNG),
        "gif" => Some(mime::IMAGE_GIF),
        "svg" => Some(mime::IMAGE_SVG),
        "bmp" => Some(mime::IMAGE_BMP),
        "webp" => "image/webp".parse().ok(),
        "ico" => "image/x-icon".parse().ok(),
        _ => None,
    }
}

/// Inspect one file
///
/// Errors (missing file, unreadable metadata, non-UTF-8 name) are returned to
/// the caller, which logs them and leaves the file out of the run.
pub fn inspect(path: &Path, config: &IngestConfig) -> Result<ImageDescriptor> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            LogoError::invalid_path(format!("{} has no UTF-8 file name", path.display()))
        })?
        .to_string();

    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(LogoError::invalid_path(format!("{} is not a regular file", path.display())));
    }

    let extension = extension_of(path);
    let size_bytes = metadata.len();
    let mime_type = mime_for_extension(&extension)
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| UNKNOWN_MIME.to_string());

    Ok(ImageDescriptor {
        path: path.to_path_buf(),
        code: extract_code(&name),
        is_supported_format: config.is_supported_extension(&extension),
        is_valid_size: SizeLimits::from(config).contains(size_bytes),
        created: metadata.created().ok().map(DateTime::<Utc>::from),
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        name,
        extension,
        size_bytes,
        mime_type,
    })
}
