//! Object storage for generated images
//!
//! The image pipeline only sees `ObjectStore`: bytes in, URL out. A failed
//! put is not retried; the pipeline switches to inline delivery instead.

use crate::config::StorageConfig;
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read storage secret {path}: {source}")]
    SecretFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload of {key} to bucket {bucket} failed: {reason}")]
    Upload {
        bucket: String,
        key: String,
        reason: String,
    },
}

/// Blob sink returning a retrievable URL for each stored object
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// S3 (or S3-compatible) object store
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
}

impl S3ObjectStore {
    /// Build a client from configuration
    ///
    /// Without key files the default AWS credential chain is used.
    pub async fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let (Some(access), Some(secret)) = (&config.access_key_file, &config.secret_key_file) {
            let access_key = read_secret(access).await?;
            let secret_key = read_secret(secret).await?;
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "chatrelay-secret-files",
            ));
        }

        if let Some(endpoint) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let shared = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(config.endpoint_url.is_some())
            .build();

        tracing::info!(
            bucket = %config.bucket,
            region = %config.region,
            custom_endpoint = config.endpoint_url.is_some(),
            "Object store initialized"
        );

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
            region: config.region.clone(),
            endpoint_url: config.endpoint_url.clone(),
        })
    }

    /// Public URL of `key` in this store
    pub fn object_url(&self, key: &str) -> String {
        object_url(&self.bucket, &self.region, self.endpoint_url.as_deref(), key)
    }
}

/// Public URL of `key` given the bucket location
pub fn object_url(bucket: &str, region: &str, endpoint_url: Option<&str>, key: &str) -> String {
    match endpoint_url {
        Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), bucket, key),
        None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, region, key),
    }
}

async fn read_secret(path: &Path) -> Result<String, StorageError> {
    tokio::fs::read_to_string(path)
        .await
        .map(|s| s.trim().to_string())
        .map_err(|source| StorageError::SecretFile {
            path: path.display().to_string(),
            source,
        })
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let size = bytes.len();

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                bucket: self.bucket.clone(),
                key: key.to_string(),
                reason: DisplayErrorContext(&e).to_string(),
            })?;

        let url = self.object_url(key);
        tracing::info!(key = %key, bytes = size, url = %url, "Object uploaded");
        Ok(url)
    }
}
