//! S3-compatible object store using AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::ObjectStore;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use satchel_core::config::StorageConfig;
use std::time::Duration;
use tracing::instrument;

/// Upper bound on the startup probe so a black-holed endpoint fails fast.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// S3-compatible object store.
pub struct S3Backend {
    client: Client,
    bucket: String,
    /// Normalized endpoint URL.
    endpoint: String,
    region: String,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

/// Prepend `http://` to bare `host:port` endpoints (e.g. "minio:9000").
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    let lower = endpoint.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("http://{endpoint}")
    }
}

impl S3Backend {
    /// Create a client for the configured endpoint and bucket.
    ///
    /// Explicit credentials are used when both keys are configured; otherwise
    /// the ambient AWS credential chain (env vars, profile, instance role).
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        config.validate().map_err(StorageError::Config)?;

        let region = config
            .region
            .clone()
            .unwrap_or_else(|| "us-east-1".to_string());
        let endpoint = normalize_endpoint(&config.endpoint);

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()))
            .endpoint_url(&endpoint)
            .force_path_style(config.force_path_style);

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            let credentials = aws_sdk_s3::config::Credentials::new(
                key_id.clone(),
                secret.clone(),
                None,
                None,
                "satchel-config",
            );
            builder = builder.credentials_provider(credentials);
        } else {
            let chain = aws_config::default_provider::credentials::DefaultCredentialsChain::builder()
                .region(aws_config::Region::new(region.clone()))
                .build()
                .await;
            builder = builder.credentials_provider(chain);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
            endpoint,
            region,
        })
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    fn backend_name(&self) -> &'static str {
        "s3"
    }

    fn location(&self) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), self.bucket)
    }

    #[instrument(skip(self), fields(backend = "s3", bucket = %self.bucket))]
    async fn health_check(&self) -> StorageResult<()> {
        let probe = self.client.head_bucket().bucket(&self.bucket).send();

        match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, probe).await {
            Err(_) => Err(StorageError::Timeout(HEALTH_CHECK_TIMEOUT)),
            Ok(Ok(_)) => Ok(()),
            Ok(Err(err)) => {
                if err
                    .as_service_error()
                    .is_some_and(|service_err| service_err.is_not_found())
                {
                    Err(StorageError::BucketNotFound(self.bucket.clone()))
                } else {
                    Err(StorageError::S3(Box::new(err)))
                }
            }
        }
    }
}
