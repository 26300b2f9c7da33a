//! Configuration management
//!
//! The CLI builds one [`IngestConfig`] at startup and hands it to the pipeline.
//! Nothing below the CLI reads the process environment.

use crate::storage::config::StorageConfig;
use banklogo_common::{LogoError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ============================================================================
// Ingest Configuration Constants
// ============================================================================

/// Default directory scanned for candidate logo files.
pub const DEFAULT_LOGO_DIR: &str = "./logos";

/// Default location of the institution registry JSON.
pub const DEFAULT_REGISTRY_PATH: &str = "./banks.json";

/// Default smallest accepted file size in bytes (inclusive).
pub const DEFAULT_MIN_FILE_SIZE: u64 = 1024;

/// Default largest accepted file size in bytes (inclusive, 1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Extensions accepted when `SUPPORTED_EXTENSIONS` is not set.
pub const DEFAULT_SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "svg"];

/// Marker substring that identifies a placeholder icon URL or artwork file.
pub const PLACEHOLDER_MARKER: &str = "default-image";

/// Runtime configuration for one ingest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory holding `<code>.<ext>` candidate files
    pub directory: PathBuf,

    /// Registry JSON, read at startup and rewritten by cleanup
    pub registry_path: PathBuf,

    /// Validate and match only; never write to storage or the working tree
    pub ci_mode: bool,

    pub min_file_size: u64,
    pub max_file_size: u64,

    /// Lowercase extensions without the leading dot
    pub supported_extensions: Vec<String>,

    /// Explicit placeholder icon URL; derived from the public domain when unset
    pub placeholder_icon: Option<String>,

    pub storage: StorageConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_LOGO_DIR),
            registry_path: PathBuf::from(DEFAULT_REGISTRY_PATH),
            ci_mode: false,
            min_file_size: DEFAULT_MIN_FILE_SIZE,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            supported_extensions: DEFAULT_SUPPORTED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            placeholder_icon: None,
            storage: StorageConfig::default(),
        }
    }
}

impl IngestConfig {
    /// Load configuration from the process environment and a `.env` file if present
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let config = Self {
            directory: get("LOGO_DIR").map(PathBuf::from).unwrap_or(defaults.directory),
            registry_path: get("BANKS_JSON_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.registry_path),
            ci_mode: get("CI").map(|v| parse_flag(&v)).unwrap_or(false),
            min_file_size: parse_size(get("MIN_FILE_SIZE"), "MIN_FILE_SIZE")?
                .unwrap_or(defaults.min_file_size),
            max_file_size: parse_size(get("MAX_FILE_SIZE"), "MAX_FILE_SIZE")?
                .unwrap_or(defaults.max_file_size),
            supported_extensions: get("SUPPORTED_EXTENSIONS")
                .map(|list| normalize_extensions(list.split(',')))
                .unwrap_or(defaults.supported_extensions),
            placeholder_icon: get("DEFAULT_ICON_URL"),
            storage: StorageConfig::from_lookup(&get),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_file_size == 0 {
            return Err(LogoError::config("MAX_FILE_SIZE must be greater than 0"));
        }

        if self.min_file_size > self.max_file_size {
            return Err(LogoError::config(format!(
                "MIN_FILE_SIZE ({}) cannot be greater than MAX_FILE_SIZE ({})",
                self.min_file_size, self.max_file_size
            )));
        }

        if self.supported_extensions.is_empty() {
            return Err(LogoError::config("SUPPORTED_EXTENSIONS cannot be empty"));
        }

        Ok(())
    }

    /// Whether `extension` (any case, with or without a dot) is in the allow-list
    pub fn is_supported_extension(&self, extension: &str) -> bool {
        let ext = extension.trim_start_matches('.').to_lowercase();
        self.supported_extensions.iter().any(|allowed| *allowed == ext)
    }

    /// Icon URL written for institutions that have no uploaded logo yet
    pub fn placeholder_icon(&self) -> String {
        if let Some(ref explicit) = self.placeholder_icon {
            return explicit.clone();
        }
        match self.storage.public_domain {
            Some(ref domain) => format!(
                "{}/logo/{}",
                domain.trim_end_matches('/'),
                PLACEHOLDER_MARKER
            ),
            None => format!("/logo/{}", PLACEHOLDER_MARKER),
        }
    }
}

/// True when a URL or file name carries the placeholder marker
pub fn is_placeholder(value: &str) -> bool {
    value.contains(PLACEHOLDER_MARKER)
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

fn parse_size(value: Option<String>, key: &str) -> Result<Option<u64>> {
    value
        .map(|v| {
            v.parse::<u64>().map_err(|_| {
                LogoError::config(format!("{} must be a whole number of bytes, got '{}'", key, v))
            })
        })
        .transpose()
}

fn normalize_extensions<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    raw.map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<IngestConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IngestConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.directory, PathBuf::from(DEFAULT_LOGO_DIR));
        assert_eq!(config.registry_path, PathBuf::from(DEFAULT_REGISTRY_PATH));
        assert!(!config.ci_mode);
        assert_eq!(config.min_file_size, DEFAULT_MIN_FILE_SIZE);
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.supported_extensions, vec!["jpg", "jpeg", "png", "gif", "svg"]);
        assert!(!config.storage.is_complete());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("LOGO_DIR", "/srv/logos"),
            ("CI", "true"),
            ("MIN_FILE_SIZE", "10"),
            ("MAX_FILE_SIZE", "2048"),
            ("SUPPORTED_EXTENSIONS", " .PNG, webp ,,"),
        ])
        .unwrap();

        assert_eq!(config.directory, PathBuf::from("/srv/logos"));
        assert!(config.ci_mode);
        assert_eq!(config.min_file_size, 10);
        assert_eq!(config.max_file_size, 2048);
        assert_eq!(config.supported_extensions, vec!["png", "webp"]);
        assert!(config.is_supported_extension(".Png"));
        assert!(!config.is_supported_extension("jpg"));
    }

    #[test]
    fn test_ci_flag_values() {
        assert!(config_from(&[("CI", "1")]).unwrap().ci_mode);
        assert!(!config_from(&[("CI", "false")]).unwrap().ci_mode);
        assert!(!config_from(&[("CI", "")]).unwrap().ci_mode);
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        assert!(config_from(&[("MAX_FILE_SIZE", "big")]).is_err());
        assert!(config_from(&[("MAX_FILE_SIZE", "0")]).is_err());
        let err = config_from(&[("MIN_FILE_SIZE", "500"), ("MAX_FILE_SIZE", "100")]).unwrap_err();
        assert!(err.to_string().contains("cannot be greater than"));
    }

    #[test]
    fn test_empty_extension_list_rejected() {
        assert!(config_from(&[("SUPPORTED_EXTENSIONS", " , ")]).is_err());
    }

    #[test]
    fn test_placeholder_icon() {
        let config = config_from(&[("R2_PUBLIC_DOMAIN", "https://cdn.example.com/")]).unwrap();
        assert_eq!(config.placeholder_icon(), "https://cdn.example.com/logo/default-image");

        let config = config_from(&[("DEFAULT_ICON_URL", "https://img/none.png")]).unwrap();
        assert_eq!(config.placeholder_icon(), "https://img/none.png");

        assert!(is_placeholder(&config_from(&[]).unwrap().placeholder_icon()));
    }

    #[test]
    fn test_is_placeholder() {
        assert!(is_placeholder("https://cdn/logo/default-image"));
        assert!(!is_placeholder("https://cdn/logo/77"));
    }
}
