//! Validation and matching
//!
//! [`MatchingEngine::process`] decides the fate of one image. Rules run in a
//! fixed order and the first failing rule decides the outcome:
//!
//! 1. format must be in the allow-list
//! 2. the file name must carry a numeric code
//! 3. the size must fall inside the configured window
//! 4. the code must match an institution's code or NIP code
//! 5. an institution that already has a real icon is done, nothing is uploaded
//! 6. in CI mode the existing icon is returned, nothing is uploaded
//! 7. otherwise the file is uploaded and the new URL recorded on the institution
//!
//! Every failure is returned as a [`ProcessingError`]; none of them stop the run.

use crate::config::{is_placeholder, IngestConfig};
use crate::inspector::{ImageDescriptor, SizeLimits};
use crate::registry::Registry;
use crate::scanner::unsupported_reason;
use crate::storage::{logo_key, UploadGateway};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Classification of a per-image failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProcessingErrorKind {
    /// Format or size does not conform
    Validation,
    /// No usable code in the name, or no institution for it
    Match,
    /// Storage refused or failed the write
    Upload,
}

impl std::fmt::Display for ProcessingErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProcessingErrorKind::Validation => "ValidationError",
            ProcessingErrorKind::Match => "MatchError",
            ProcessingErrorKind::Upload => "UploadError",
        };
        f.write_str(name)
    }
}

/// A classified per-image failure with a human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ProcessingError {
    pub kind: ProcessingErrorKind,
    pub message: String,
}

impl ProcessingError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ProcessingErrorKind::Validation,
            message: message.into(),
        }
    }

    pub fn matching(message: impl Into<String>) -> Self {
        Self {
            kind: ProcessingErrorKind::Match,
            message: message.into(),
        }
    }

    pub fn upload(message: impl Into<String>) -> Self {
        Self {
            kind: ProcessingErrorKind::Upload,
            message: message.into(),
        }
    }
}

/// Resolved icon URL, or why the image was rejected
pub type ProcessingResult = Result<String, ProcessingError>;

/// Applies the rule chain to descriptors against one registry and gateway
pub struct MatchingEngine<'a> {
    registry: &'a mut Registry,
    gateway: &'a dyn UploadGateway,
    limits: SizeLimits,
    ci_mode: bool,
}

impl<'a> MatchingEngine<'a> {
    pub fn new(
        registry: &'a mut Registry,
        gateway: &'a dyn UploadGateway,
        config: &IngestConfig,
    ) -> Self {
        Self {
            registry,
            gateway,
            limits: SizeLimits::from(config),
            ci_mode: config.ci_mode,
        }
    }

    /// Decide the outcome for one image
    ///
    /// On a registry match the descriptor's `code` is replaced by the
    /// institution's canonical NIP code.
    pub async fn process(&mut self, descriptor: &mut ImageDescriptor) -> ProcessingResult {
        if !descriptor.is_supported_format {
            return Err(ProcessingError::validation(unsupported_reason(&descriptor.extension)));
        }

        let Some(code) = descriptor.code.clone() else {
            return Err(ProcessingError::matching("no code found"));
        };

        if !descriptor.is_valid_size {
            let detail = if descriptor.size_bytes > self.limits.max {
                format!("too large ({} bytes, max {})", descriptor.size_bytes, self.limits.max)
            } else {
                format!("too small ({} bytes, min {})", descriptor.size_bytes, self.limits.min)
            };
            return Err(ProcessingError::validation(format!("invalid size: {}", detail)));
        }

        let Some(index) = self.registry.find(&code) else {
            return Err(ProcessingError::matching(format!("no bank found for code {}", code)));
        };

        let (canonical, institution, current_icon) = match self.registry.get(index) {
            Some(record) => (
                canonical_code(&record.code, &record.nip_code),
                record.name.clone(),
                record.icon.clone(),
            ),
            None => {
                return Err(ProcessingError::matching(format!(
                    "no bank found for code {}",
                    code
                )))
            }
        };

        debug!(
            file = %descriptor.name,
            code = %code,
            canonical = %canonical,
            institution = %institution,
            "Matched institution"
        );
        descriptor.code = Some(canonical.clone());

        if let Some(ref icon) = current_icon {
            if !icon.trim().is_empty() && !is_placeholder(icon) {
                info!(file = %descriptor.name, institution = %institution, "Icon already set");
                return Ok(icon.clone());
            }
        }

        if self.ci_mode {
            debug!(file = %descriptor.name, "CI mode, upload skipped");
            return Ok(current_icon.unwrap_or_default());
        }

        let data = tokio::fs::read(&descriptor.path).await.map_err(|e| {
            ProcessingError::upload(format!("cannot read {}: {}", descriptor.path.display(), e))
        })?;

        let url = self
            .gateway
            .upload(&logo_key(&canonical), data, &descriptor.mime_type)
            .await
            .map_err(|e| {
                warn!(file = %descriptor.name, error = %e, "Upload failed");
                ProcessingError::upload(e.to_string())
            })?;

        self.registry.set_icon(index, url.clone());
        info!(file = %descriptor.name, institution = %institution, url = %url, "Icon recorded");

        Ok(url)
    }
}

/// NIP code when the record has one, the bank code otherwise
fn canonical_code(code: &str, nip_code: &str) -> String {
    if nip_code.is_empty() {
        code.to_string()
    } else {
        nip_code.to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::inspector::inspect;
    use crate::registry::InstitutionRecord;
    use crate::storage::StorageError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Gateway that records calls and answers from a fixed domain
    #[derive(Default)]
    struct RecordingGateway {
        calls: Mutex<Vec<(String, usize, String)>>,
        fail_with: Option<StorageError>,
    }

    impl RecordingGateway {
        fn failing(error: StorageError) -> Self {
            Self {
                fail_with: Some(error),
                ..Self::default()
            }
        }

        fn keys(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(k, _, _)| k.clone()).collect()
        }
    }

    #[async_trait]
    impl UploadGateway for RecordingGateway {
        async fn upload(
            &self,
            key: &str,
            data: Vec<u8>,
            content_type: &str,
        ) -> Result<String, StorageError> {
            self.calls
                .lock()
                .unwrap()
                .push((key.to_string(), data.len(), content_type.to_string()));
            match self.fail_with {
                Some(ref err) => Err(err.clone()),
                None => Ok(format!("https://cdn/{}", key)),
            }
        }
    }

    struct Fixture {
        dir: TempDir,
        config: IngestConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let config = IngestConfig {
                directory: dir.path().to_path_buf(),
                min_file_size: 4,
                max_file_size: 64,
                ..IngestConfig::default()
            };
            Self { dir, config }
        }

        fn descriptor(&self, name: &str, size: usize) -> ImageDescriptor {
            let path = self.dir.path().join(name);
            std::fs::write(&path, vec![7u8; size]).unwrap();
            inspect(&path, &self.config).unwrap()
        }
    }

    fn registry_with_icon(icon: Option<&str>) -> Registry {
        let mut record = InstitutionRecord::new("033", "77", "Union Bank");
        record.icon = icon.map(str::to_string);
        Registry::new(vec![InstitutionRecord::new("011", "000016", "First Bank"), record])
    }

    #[tokio::test]
    async fn test_unsupported_format_is_validation_error() {
        let fx = Fixture::new();
        let mut descriptor = fx.descriptor("77.tiff", 10);
        let mut registry = registry_with_icon(None);
        let gateway = RecordingGateway::default();

        let err = MatchingEngine::new(&mut registry, &gateway, &fx.config)
            .process(&mut descriptor)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ProcessingErrorKind::Validation);
        assert!(err.message.contains("unsupported format"));
    }

    #[tokio::test]
    async fn test_missing_code_is_match_error() {
        let fx = Fixture::new();
        let mut descriptor = fx.descriptor("logo-a.png", 10);
        let mut registry = registry_with_icon(None);
        let gateway = RecordingGateway::default();

        let err = MatchingEngine::new(&mut registry, &gateway, &fx.config)
            .process(&mut descriptor)
            .await
            .unwrap_err();

        assert_eq!(err, ProcessingError::matching("no code found"));
    }

    #[tokio::test]
    async fn test_code_is_checked_before_size() {
        let fx = Fixture::new();
        let mut descriptor = fx.descriptor("logo-a.png", 1000);
        let mut registry = registry_with_icon(None);
        let gateway = RecordingGateway::default();

        let err = MatchingEngine::new(&mut registry, &gateway, &fx.config)
            .process(&mut descriptor)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ProcessingErrorKind::Match);
    }

    #[tokio::test]
    async fn test_size_sub_reasons() {
        let fx = Fixture::new();
        let mut registry = registry_with_icon(None);
        let gateway = RecordingGateway::default();
        let mut engine = MatchingEngine::new(&mut registry, &gateway, &fx.config);

        let mut large = fx.descriptor("77.png", 65);
        let err = engine.process(&mut large).await.unwrap_err();
        assert_eq!(err.kind, ProcessingErrorKind::Validation);
        assert!(err.message.starts_with("invalid size: too large"));

        let mut small = fx.descriptor("78.png", 3);
        let err = engine.process(&mut small).await.unwrap_err();
        assert!(err.message.starts_with("invalid size: too small"));

        assert!(gateway.keys().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_code_is_match_error() {
        let fx = Fixture::new();
        let mut descriptor = fx.descriptor("404.png", 10);
        let mut registry = registry_with_icon(None);
        let gateway = RecordingGateway::default();

        let err = MatchingEngine::new(&mut registry, &gateway, &fx.config)
            .process(&mut descriptor)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ProcessingErrorKind::Match);
        assert!(err.message.starts_with("no bank found"));
        assert_eq!(descriptor.code.as_deref(), Some("404"));
    }

    #[tokio::test]
    async fn test_existing_icon_short_circuits_upload() {
        let fx = Fixture::new();
        let mut descriptor = fx.descriptor("77.png", 10);
        let mut registry = registry_with_icon(Some("https://cdn/logo/77"));
        let gateway = RecordingGateway::default();

        let url = MatchingEngine::new(&mut registry, &gateway, &fx.config)
            .process(&mut descriptor)
            .await
            .unwrap();

        assert_eq!(url, "https://cdn/logo/77");
        assert!(gateway.keys().is_empty());
    }

    #[tokio::test]
    async fn test_placeholder_icon_triggers_upload() {
        let fx = Fixture::new();
        let mut descriptor = fx.descriptor("77.png", 10);
        let mut registry = registry_with_icon(Some("https://cdn/logo/default-image"));
        let gateway = RecordingGateway::default();

        let url = MatchingEngine::new(&mut registry, &gateway, &fx.config)
            .process(&mut descriptor)
            .await
            .unwrap();

        assert_eq!(url, "https://cdn/logo/77");
        assert_eq!(gateway.keys(), vec!["logo/77"]);
        assert_eq!(registry.get(1).unwrap().icon.as_deref(), Some("https://cdn/logo/77"));
    }

    #[tokio::test]
    async fn test_match_by_bank_code_uploads_under_nip_code() {
        let fx = Fixture::new();
        let mut descriptor = fx.descriptor("033.jpg", 12);
        let mut registry = registry_with_icon(None);
        let gateway = RecordingGateway::default();

        let url = MatchingEngine::new(&mut registry, &gateway, &fx.config)
            .process(&mut descriptor)
            .await
            .unwrap();

        assert_eq!(url, "https://cdn/logo/77");
        assert_eq!(descriptor.code.as_deref(), Some("77"));
        let calls = gateway.calls.lock().unwrap();
        assert_eq!(calls[0], ("logo/77".to_string(), 12, "image/jpeg".to_string()));
    }

    #[tokio::test]
    async fn test_ci_mode_never_uploads_or_mutates() {
        let mut fx = Fixture::new();
        fx.config.ci_mode = true;
        let mut descriptor = fx.descriptor("77.jpg", 10);
        let mut registry = registry_with_icon(Some("https://cdn/logo/default-image"));
        let before = registry.records().to_vec();
        let gateway = RecordingGateway::default();

        let url = MatchingEngine::new(&mut registry, &gateway, &fx.config)
            .process(&mut descriptor)
            .await
            .unwrap();

        assert_eq!(url, "https://cdn/logo/default-image");
        assert!(gateway.keys().is_empty());
        assert_eq!(registry.records(), before.as_slice());
    }

    #[tokio::test]
    async fn test_upload_failure_is_upload_error() {
        let fx = Fixture::new();
        let mut descriptor = fx.descriptor("77.png", 10);
        let mut registry = registry_with_icon(None);
        let gateway =
            RecordingGateway::failing(StorageError::Upload("connection reset".to_string()));

        let err = MatchingEngine::new(&mut registry, &gateway, &fx.config)
            .process(&mut descriptor)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ProcessingErrorKind::Upload);
        assert!(err.message.contains("connection reset"));
        assert_eq!(registry.get(1).unwrap().icon, None);
    }

    #[test]
    fn test_error_display() {
        let err = ProcessingError::validation("invalid size: too large");
        assert_eq!(err.to_string(), "ValidationError: invalid size: too large");
    }
}
