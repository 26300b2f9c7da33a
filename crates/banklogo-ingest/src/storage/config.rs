use serde::{Deserialize, Serialize};

/// Credentials and addressing for the R2 bucket that serves logos
///
/// Every field except `endpoint` is required before an upload is attempted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub access_key_id: Option<String>,
    #[serde(skip_serializing)]
    pub secret_access_key: Option<String>,
    pub account_id: Option<String>,
    pub bucket: Option<String>,
    /// Base URL objects are publicly served from, e.g. `https://cdn.example.com`
    pub public_domain: Option<String>,
    /// S3 endpoint override (MinIO, local testing); derived from the account id otherwise
    pub endpoint: Option<String>,
}

impl StorageConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            access_key_id: lookup("R2_ACCESS_KEY_ID"),
            secret_access_key: lookup("R2_SECRET_ACCESS_KEY"),
            account_id: lookup("R2_ACCOUNT_ID"),
            bucket: lookup("R2_BUCKET_NAME"),
            public_domain: lookup("R2_PUBLIC_DOMAIN"),
            endpoint: lookup("R2_ENDPOINT"),
        }
    }

    /// Environment variable names of the required fields that are unset
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("R2_ACCESS_KEY_ID", &self.access_key_id),
            ("R2_SECRET_ACCESS_KEY", &self.secret_access_key),
            ("R2_ACCOUNT_ID", &self.account_id),
            ("R2_BUCKET_NAME", &self.bucket),
            ("R2_PUBLIC_DOMAIN", &self.public_domain),
        ]
        .into_iter()
        .filter(|(_, value)| value.as_deref().is_none_or(|v| v.trim().is_empty()))
        .map(|(name, _)| name)
        .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// S3 API endpoint for the account
    pub fn endpoint_url(&self) -> Option<String> {
        self.endpoint.clone().or_else(|| {
            self.account_id
                .as_ref()
                .map(|account| format!("https://{}.r2.cloudflarestorage.com", account))
        })
    }

    /// Public URL for an object key, `None` without a public domain
    pub fn public_url(&self, key: &str) -> Option<String> {
        self.public_domain.as_ref().map(|domain| {
            format!(
                "{}/{}",
                domain.trim_end_matches('/'),
                key.trim_start_matches('/')
            )
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn complete() -> StorageConfig {
        StorageConfig {
            access_key_id: Some("key".to_string()),
            secret_access_key: Some("secret".to_string()),
            account_id: Some("acct123".to_string()),
            bucket: Some("logos".to_string()),
            public_domain: Some("https://cdn.example.com".to_string()),
            endpoint: None,
        }
    }

    #[test]
    fn test_complete_config() {
        let config = complete();
        assert!(config.is_complete());
        assert_eq!(
            config.endpoint_url().as_deref(),
            Some("https://acct123.r2.cloudflarestorage.com")
        );
    }

    #[test]
    fn test_missing_fields() {
        let mut config = complete();
        config.bucket = None;
        config.secret_access_key = Some("  ".to_string());
        assert_eq!(config.missing_fields(), vec!["R2_SECRET_ACCESS_KEY", "R2_BUCKET_NAME"]);
        assert!(!config.is_complete());
        assert_eq!(StorageConfig::default().missing_fields().len(), 5);
    }

    #[test]
    fn test_endpoint_override() {
        let mut config = complete();
        config.endpoint = Some("http://localhost:9000".to_string());
        assert_eq!(config.endpoint_url().as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn test_public_url() {
        let mut config = complete();
        assert_eq!(
            config.public_url("logo/058").as_deref(),
            Some("https://cdn.example.com/logo/058")
        );
        config.public_domain = Some("https://cdn.example.com/".to_string());
        assert_eq!(
            config.public_url("/logo/058").as_deref(),
            Some("https://cdn.example.com/logo/058")
        );
    }

    #[test]
    fn test_secret_not_serialized() {
        let json = serde_json::to_string(&complete()).unwrap();
        assert!(!json.contains("secret"));
    }
}
