//! Configuration types shared across crates.

use crate::secret::SharedSecret;
use serde::{Deserialize, Serialize};

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Path prefix the upload handler chain is mounted under.
    /// Served both with and without a trailing separator.
    #[serde(default = "default_base_path")]
    pub base_path: String,
    /// Capacity of the completion notification queue. Producers wait for
    /// room once it is full.
    #[serde(default = "default_completion_queue_capacity")]
    pub completion_queue_capacity: usize,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_base_path() -> String {
    crate::DEFAULT_BASE_PATH.to_string()
}

fn default_completion_queue_capacity() -> usize {
    crate::DEFAULT_COMPLETION_QUEUE_CAPACITY
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            base_path: default_base_path(),
            completion_queue_capacity: default_completion_queue_capacity(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl ServerConfig {
    /// The base path without any trailing separator (e.g. "/attachments").
    pub fn base_path(&self) -> &str {
        self.base_path.trim_end_matches('/')
    }

    /// Validate server configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        let base = self.base_path();
        if !base.starts_with('/') || base.len() < 2 {
            return Err(format!(
                "server.base_path must be an absolute, non-root path (got {:?})",
                self.base_path
            ));
        }
        if base.contains(['{', '}']) {
            return Err(format!(
                "server.base_path cannot contain '{{' or '}}' (got {:?})",
                self.base_path
            ));
        }
        // The upload chain also claims every path below the base.
        if let Some(reserved) = crate::RESERVED_PATHS.iter().find(|reserved| {
            **reserved == base
                || reserved
                    .strip_prefix(base)
                    .is_some_and(|rest| rest.starts_with('/'))
        }) {
            return Err(format!(
                "server.base_path {:?} clashes with the {reserved} endpoint",
                self.base_path
            ));
        }
        if self.completion_queue_capacity == 0 {
            return Err("server.completion_queue_capacity cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Object store the upload handler writes to. Only probed at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Endpoint URL (e.g., "http://localhost:9000" for MinIO). Required.
    #[serde(default)]
    pub endpoint: String,
    /// Bucket holding upload objects.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    /// AWS region.
    pub region: Option<String>,
    /// AWS access key ID. Falls back to the ambient AWS credential chain if not set.
    pub access_key_id: Option<String>,
    /// AWS secret access key. Falls back to the ambient AWS credential chain if not set.
    pub secret_access_key: Option<String>,
    /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO.
    #[serde(default = "default_force_path_style")]
    pub force_path_style: bool,
}

fn default_bucket() -> String {
    "attachment".to_string()
}

fn default_force_path_style() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            bucket: default_bucket(),
            region: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: default_force_path_style(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("storage.endpoint is required".to_string());
        }
        if self.bucket.trim().is_empty() {
            return Err("storage.bucket cannot be empty".to_string());
        }
        match (self.access_key_id.as_ref(), self.secret_access_key.as_ref()) {
            (Some(_), Some(_)) | (None, None) => Ok(()),
            _ => Err(
                "storage config requires both access_key_id and secret_access_key when either is set"
                    .to_string(),
            ),
        }
    }
}

/// Identifier registry configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Connection URL: `sqlite:<path>` or `postgres://...`. Required.
    #[serde(default)]
    pub url: String,
    /// Maximum connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
        }
    }
}

impl RegistryConfig {
    /// Validate registry configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("registry.url is required".to_string());
        }
        if self.max_connections == 0 {
            return Err("registry.max_connections cannot be 0".to_string());
        }
        Ok(())
    }
}

/// Shared-secret authentication configuration.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base64-encoded shared secret. Required.
    #[serde(default)]
    pub secret: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl AuthConfig {
    /// Decode the configured secret.
    pub fn shared_secret(&self) -> crate::Result<SharedSecret> {
        if self.secret.trim().is_empty() {
            return Err(crate::Error::Config("auth.secret is required".to_string()));
        }
        SharedSecret::from_base64(&self.secret)
    }
}

/// Upstream upload handler configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Base URL of the upstream tus server (e.g., "http://127.0.0.1:1080/files/").
    #[serde(default = "default_upstream")]
    pub upstream: String,
}

fn default_upstream() -> String {
    "http://127.0.0.1:1080/files/".to_string()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upstream: default_upstream(),
        }
    }
}

impl UploadConfig {
    /// Validate upload configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        let lower = self.upstream.to_ascii_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(format!(
                "upload.upstream must be an http(s) URL (got {:?})",
                self.upstream
            ));
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Object store configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Identifier registry configuration.
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Upstream upload handler configuration.
    #[serde(default)]
    pub upload: UploadConfig,
}

impl AppConfig {
    /// Validate the whole configuration, failing on the first problem.
    pub fn validate(&self) -> crate::Result<()> {
        self.server.validate().map_err(crate::Error::Config)?;
        self.storage.validate().map_err(crate::Error::Config)?;
        self.registry.validate().map_err(crate::Error::Config)?;
        self.auth.shared_secret()?;
        self.upload.validate().map_err(crate::Error::Config)?;
        Ok(())
    }

    /// Create a test configuration with every required field filled in.
    ///
    /// **For testing only.** The secret is base64 of "test-secret".
    pub fn for_testing() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig {
                endpoint: "http://localhost:9000".to_string(),
                ..Default::default()
            },
            registry: RegistryConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            auth: AuthConfig {
                secret: "dGVzdC1zZWNyZXQ=".to_string(),
            },
            upload: UploadConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_testing_config_is_valid() {
        AppConfig::for_testing().validate().unwrap();
    }

    #[test]
    fn test_missing_required_fields_rejected() {
        let mut config = AppConfig::for_testing();
        config.storage.endpoint = String::new();
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));

        let mut config = AppConfig::for_testing();
        config.registry.url = " ".to_string();
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));

        let mut config = AppConfig::for_testing();
        config.auth.secret = String::new();
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_undecodable_secret_rejected() {
        let mut config = AppConfig::for_testing();
        config.auth.secret = "***".to_string();
        assert!(matches!(
            config.validate(),
            Err(crate::Error::InvalidSecret(_))
        ));
    }

    #[test]
    fn test_base_path_trailing_separator_trimmed() {
        let config = ServerConfig {
            base_path: "/attachments/".to_string(),
            ..Default::default()
        };
        assert_eq!(config.base_path(), "/attachments");
        config.validate().unwrap();
    }

    #[test]
    fn test_base_path_must_be_absolute_and_non_root() {
        for bad in ["attachments", "/", ""] {
            let config = ServerConfig {
                base_path: bad.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_base_path_cannot_shadow_fixed_routes() {
        for bad in [
            "/health",
            "/health/",
            "/metrics",
            "/hooks",
            "/hooks/tus",
            "/hooks/tus/",
            "/{name}",
            "/files/{*rest}",
            "/a}",
        ] {
            let config = ServerConfig {
                base_path: bad.to_string(),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{bad:?} should be rejected");
        }

        for good in ["/healthz", "/files", "/hooks-archive", "/health/files", "/hooks/tus/x"] {
            let config = ServerConfig {
                base_path: good.to_string(),
                ..Default::default()
            };
            config.validate().unwrap();
        }
    }

    #[test]
    fn test_storage_validate_partial_credentials() {
        let invalid = StorageConfig {
            endpoint: "http://localhost:9000".to_string(),
            access_key_id: Some("access-key".to_string()),
            ..Default::default()
        };
        assert!(invalid.validate().is_err());

        let valid = StorageConfig {
            endpoint: "http://localhost:9000".to_string(),
            access_key_id: Some("access-key".to_string()),
            secret_access_key: Some("secret-key".to_string()),
            ..Default::default()
        };
        assert!(valid.validate().is_ok());
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{
            "storage": {"endpoint": "http://minio:9000"},
            "registry": {"url": "sqlite:./data/registry.db"},
            "auth": {"secret": "dGVzdC1zZWNyZXQ="}
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.server.base_path(), "/attachments");
        assert_eq!(config.server.completion_queue_capacity, 1024);
        assert_eq!(config.storage.bucket, "attachment");
        assert!(config.storage.force_path_style);
        assert_eq!(config.registry.max_connections, 10);
        config.validate().unwrap();
    }

    #[test]
    fn test_auth_config_debug_redacts_secret() {
        let config = AuthConfig {
            secret: "dGVzdC1zZWNyZXQ=".to_string(),
        };
        assert!(!format!("{config:?}").contains("dGVzdC1zZWNyZXQ="));
    }
}
