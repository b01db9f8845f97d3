// Cloud Bucket - uniform object storage access
// Copyright (C) 2025 Cloud Bucket Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! MinIO & self-hosted S3-compatible buckets
//!
//! Connects an [`S3Driver`] to a custom endpoint with path-style addressing
//! and tags it [`BackendType::Minio`], so it never copies to AWS buckets.
//! A missing bucket is created on connect unless `auto_create_bucket` is off,
//! and opened to anonymous reads when `public_read` is set.
//!
//! # Configuration
//!
//! ```rust,no_run
//! use cloud_bucket_storage::minio::{connect, MinioConfig};
//! use cloud_bucket_storage::Bucket;
//!
//! # async fn run() -> cloud_bucket_storage::StorageResult<()> {
//! let config = MinioConfig::new("http://localhost:9000", "media", "minioadmin", "minioadmin");
//! let bucket = Bucket::new(connect(config).await?);
//! # Ok(())
//! # }
//! ```
//!
//! # Self-Hosted MinIO Deployment
//!
//! For local development with Docker:
//!
//! ```bash
//! docker run -p 9000:9000 -p 9001:9001 \
//!   -e MINIO_ROOT_USER=minioadmin \
//!   -e MINIO_ROOT_PASSWORD=minioadmin \
//!   minio/minio server /data --console-address ":9001"
//! ```

use crate::error::{StorageError, StorageResult};
use crate::s3::{default_part_size, is_not_found, sdk_error, S3Driver, DEFAULT_REGION};
use crate::types::BackendType;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::Client;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info};

fn default_true() -> bool {
    true
}

/// Configuration of a MinIO bucket
#[derive(Clone, Deserialize)]
pub struct MinioConfig {
    /// Endpoint URL, e.g. `http://localhost:9000`
    #[serde(alias = "minio_endpoint")]
    pub endpoint: String,

    /// Bucket name
    #[serde(alias = "bucketName", alias = "bucket")]
    pub bucket_name: String,

    /// Access key ID
    pub access_key_id: String,

    /// Secret access key
    #[serde(alias = "secret_access_key")]
    pub access_key_secret: String,

    /// Region reported to the server (default: `us-east-1`)
    #[serde(default)]
    pub region: Option<String>,

    /// Use path-style addressing (default: true)
    #[serde(default = "default_true")]
    pub path_style: bool,

    /// Create the bucket on connect when it does not exist (default: true)
    #[serde(default = "default_true")]
    pub auto_create_bucket: bool,

    /// Grant anonymous `s3:GetObject` on a bucket created on connect (default: false)
    #[serde(default)]
    pub public_read: bool,

    /// Part size of streaming uploads in bytes
    #[serde(default = "default_part_size")]
    pub part_size: usize,
}

impl MinioConfig {
    /// Configuration with default settings
    pub fn new(
        endpoint: impl Into<String>,
        bucket_name: impl Into<String>,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Self {
        MinioConfig {
            endpoint: endpoint.into(),
            bucket_name: bucket_name.into(),
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            region: None,
            path_style: true,
            auto_create_bucket: true,
            public_read: false,
            part_size: default_part_size(),
        }
    }

    /// Configuration from `MINIO_ENDPOINT`, `MINIO_BUCKET`, `MINIO_ACCESS_KEY`
    /// and `MINIO_SECRET_KEY`
    pub fn from_env() -> StorageResult<Self> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| {
                StorageError::invalid_config(format!("{name} environment variable not set"))
            })
        };
        Ok(Self::new(
            var("MINIO_ENDPOINT")?,
            var("MINIO_BUCKET")?,
            var("MINIO_ACCESS_KEY")?,
            var("MINIO_SECRET_KEY")?,
        ))
    }

    /// Check endpoint, bucket naming rules and credentials
    pub fn validate(&self) -> StorageResult<()> {
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            return Err(StorageError::invalid_config(
                "invalid endpoint: must start with http:// or https://",
            ));
        }

        let bucket = &self.bucket_name;
        if bucket.is_empty() {
            return Err(StorageError::invalid_config("bucket name cannot be empty"));
        }
        if bucket.len() < 3 || bucket.len() > 63 {
            return Err(StorageError::invalid_config(
                "bucket name must be between 3 and 63 characters",
            ));
        }
        if !bucket
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        {
            return Err(StorageError::invalid_config(
                "bucket name must contain only lowercase letters, numbers, dots and hyphens",
            ));
        }
        if bucket.starts_with(['-', '.']) || bucket.ends_with(['-', '.']) {
            return Err(StorageError::invalid_config(
                "bucket name cannot start or end with a hyphen or dot",
            ));
        }

        if self.access_key_id.is_empty() {
            return Err(StorageError::invalid_config("access key cannot be empty"));
        }
        if self.access_key_secret.is_empty() {
            return Err(StorageError::invalid_config("secret key cannot be empty"));
        }
        Ok(())
    }
}

impl fmt::Debug for MinioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinioConfig")
            .field("endpoint", &self.endpoint)
            .field("bucket_name", &self.bucket_name)
            .field("access_key_id", &"***")
            .field("access_key_secret", &"***")
            .field("path_style", &self.path_style)
            .field("auto_create_bucket", &self.auto_create_bucket)
            .field("public_read", &self.public_read)
            .finish()
    }
}

/// Bucket policy letting anyone read every object of `bucket`
pub fn public_read_policy(bucket: &str) -> String {
    serde_json::json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Sid": "PublicRead",
            "Effect": "Allow",
            "Principal": "*",
            "Action": "s3:GetObject",
            "Resource": format!("arn:aws:s3:::{bucket}/*"),
        }]
    })
    .to_string()
}

/// Connect to a MinIO bucket, creating it when allowed and missing
pub async fn connect(config: MinioConfig) -> StorageResult<S3Driver> {
    config.validate()?;
    let endpoint = config.endpoint.trim_end_matches('/').to_string();

    debug!(
        endpoint = %endpoint,
        bucket = %config.bucket_name,
        path_style = config.path_style,
        "Initializing MinIO driver"
    );

    let credentials = Credentials::new(
        config.access_key_id.clone(),
        config.access_key_secret.clone(),
        None,
        None,
        "cloud-bucket-minio",
    );
    let region = config
        .region
        .clone()
        .unwrap_or_else(|| DEFAULT_REGION.to_string());

    // Built directly instead of aws_config::defaults() to skip IMDS region
    // discovery, which stalls outside AWS.
    let s3_config = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .endpoint_url(&endpoint)
        .credentials_provider(credentials)
        .force_path_style(config.path_style)
        .region(Region::new(region))
        .build();
    let client = Client::from_conf(s3_config);

    match client.head_bucket().bucket(&config.bucket_name).send().await {
        Ok(_) => {}
        Err(e) if is_not_found(&e) && config.auto_create_bucket => {
            client
                .create_bucket()
                .bucket(&config.bucket_name)
                .send()
                .await
                .map_err(|e| {
                    sdk_error(format!("failed to create bucket '{}'", config.bucket_name), e)
                })?;
            info!(bucket = %config.bucket_name, endpoint = %endpoint, "Created MinIO bucket");

            if config.public_read {
                client
                    .put_bucket_policy()
                    .bucket(&config.bucket_name)
                    .policy(public_read_policy(&config.bucket_name))
                    .send()
                    .await
                    .map_err(|e| {
                        sdk_error(
                            format!("failed to set public read policy on '{}'", config.bucket_name),
                            e,
                        )
                    })?;
                info!(bucket = %config.bucket_name, "Applied public read policy");
            }
        }
        Err(e) => {
            return Err(sdk_error(
                format!("cannot access MinIO bucket '{}'", config.bucket_name),
                e,
            ))
        }
    }

    Ok(S3Driver::from_client(
        client,
        config.bucket_name,
        BackendType::Minio,
        config.part_size,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(bucket: &str) -> MinioConfig {
        MinioConfig::new("http://localhost:9000", bucket, "key", "secret")
    }

    #[test]
    fn test_valid_config() {
        assert!(config("my-bucket").validate().is_ok());
        assert!(config("bucket123").validate().is_ok());
        assert!(config("logs.2024").validate().is_ok());
    }

    #[test]
    fn test_invalid_endpoint_format() {
        let mut cfg = config("my-bucket");
        cfg.endpoint = "localhost:9000".to_string();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("http://"));
    }

    #[test]
    fn test_bucket_name_rules() {
        for name in ["", "ab", "My-Bucket", "-bucket", "bucket-", "under_score"] {
            assert!(
                matches!(config(name).validate(), Err(StorageError::InvalidConfig(_))),
                "bucket name '{}' should be rejected",
                name
            );
        }
        let long = "a".repeat(64);
        assert!(config(&long).validate().is_err());
    }

    #[test]
    fn test_empty_credentials() {
        let mut cfg = config("my-bucket");
        cfg.access_key_id.clear();
        assert!(cfg.validate().unwrap_err().to_string().contains("access key"));

        let mut cfg = config("my-bucket");
        cfg.access_key_secret.clear();
        assert!(cfg.validate().unwrap_err().to_string().contains("secret key"));
    }

    #[test]
    fn test_deserialize_original_field_names() {
        let cfg: MinioConfig = serde_json::from_value(serde_json::json!({
            "bucketName": "media",
            "access_key_id": "key",
            "access_key_secret": "secret",
            "minio_endpoint": "http://minio:9000"
        }))
        .unwrap();
        assert_eq!(cfg.endpoint, "http://minio:9000");
        assert!(cfg.path_style);
        assert!(cfg.auto_create_bucket);
        assert!(!cfg.public_read);

        let cfg: MinioConfig = serde_json::from_value(serde_json::json!({
            "bucketName": "media",
            "access_key_id": "key",
            "access_key_secret": "secret",
            "endpoint": "http://minio:9000",
            "public_read": true
        }))
        .unwrap();
        assert!(cfg.public_read);
    }

    #[test]
    fn test_public_read_policy_grants_object_reads() {
        let policy: serde_json::Value =
            serde_json::from_str(&public_read_policy("media")).unwrap();
        assert_eq!(policy["Version"], "2012-10-17");

        let statements = policy["Statement"].as_array().unwrap();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0]["Effect"], "Allow");
        assert_eq!(statements[0]["Principal"], "*");
        assert_eq!(statements[0]["Action"], "s3:GetObject");
        assert_eq!(statements[0]["Resource"], "arn:aws:s3:::media/*");
    }

    #[test]
    fn test_debug_masks_credentials() {
        let debug = format!("{:?}", MinioConfig::new("http://localhost:9000", "b", "minioadmin", "minioadmin"));
        assert!(debug.contains("MinioConfig"));
        assert!(debug.contains("localhost:9000"));
        assert!(debug.contains("***"));
        assert!(!debug.contains("minioadmin"));
    }

    #[tokio::test]
    #[ignore = "requires MinIO server"]
    async fn test_connect_from_env() {
        let cfg = MinioConfig::from_env().unwrap();
        let driver = connect(cfg).await.unwrap();
        assert_eq!(crate::Driver::backend(&driver), BackendType::Minio);
    }
}
