//! Upload gateway to the logo bucket
//!
//! Logos live in a Cloudflare R2 bucket reached through the S3 API. Every
//! object is stored under `logo/<nip code>` and served from the configured
//! public domain, so the resulting URL is known before the write happens.

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    error::DisplayErrorContext,
    primitives::ByteStream,
    Client,
};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

pub mod config;

use config::StorageConfig;

/// Region name R2 expects from S3 clients
const R2_REGION: &str = "auto";

/// Failure of a single upload attempt
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage is not configured (missing {})", .missing.join(", "))]
    NotConfigured { missing: Vec<&'static str> },

    #[error("upload failed: {0}")]
    Upload(String),
}

/// Writes logo bytes to object storage
///
/// Implementations make a single attempt and return the public URL of the
/// stored object.
#[async_trait]
pub trait UploadGateway: Send + Sync {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// Object key for an institution's logo
pub fn logo_key(code: &str) -> String {
    format!("logo/{}", code)
}

/// R2-backed gateway
///
/// Built from a possibly incomplete [`StorageConfig`]; when fields are missing
/// every upload fails with [`StorageError::NotConfigured`] without touching the
/// network.
#[derive(Clone)]
pub struct Storage {
    target: Option<Target>,
    missing: Vec<&'static str>,
}

#[derive(Clone)]
struct Target {
    client: Client,
    bucket: String,
    config: StorageConfig,
}

impl Storage {
    pub fn new(config: &StorageConfig) -> Self {
        let missing = config.missing_fields();
        if !missing.is_empty() {
            debug!(missing = ?missing, "Storage left unconfigured");
            return Self {
                target: None,
                missing,
            };
        }

        let (Some(access_key), Some(secret_key), Some(bucket)) = (
            config.access_key_id.as_deref(),
            config.secret_access_key.as_deref(),
            config.bucket.clone(),
        ) else {
            return Self {
                target: None,
                missing,
            };
        };

        let credentials = Credentials::new(access_key, secret_key, None, None, "banklogo-r2");

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(R2_REGION))
            .force_path_style(true);

        if let Some(endpoint) = config.endpoint_url() {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!(bucket = %bucket, "Storage client initialized");

        Self {
            target: Some(Target {
                client,
                bucket,
                config: config.clone(),
            }),
            missing,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.target.is_some()
    }
}

#[async_trait]
impl UploadGateway for Storage {
    #[instrument(skip(self, data), fields(size = data.len()))]
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let Some(ref target) = self.target else {
            warn!(key, "Upload refused, storage is not configured");
            return Err(StorageError::NotConfigured {
                missing: self.missing.clone(),
            });
        };

        let public_url = target.config.public_url(key).ok_or_else(|| {
            StorageError::NotConfigured {
                missing: vec!["R2_PUBLIC_DOMAIN"],
            }
        })?;

        let checksum = sha256_hex(&data);
        debug!(
            bucket = %target.bucket,
            key,
            checksum = %checksum,
            "Uploading logo"
        );

        target
            .client
            .put_object()
            .bucket(&target.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| StorageError::Upload(DisplayErrorContext(&e).to_string()))?;

        info!(key, url = %public_url, "Logo uploaded");

        Ok(public_url)
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
