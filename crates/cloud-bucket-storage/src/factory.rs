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

//! Driver selection from loosely typed bucket configuration
//!
//! The shape of the configuration decides the backend:
//!
//! | Fields present                                   | Backend |
//! |--------------------------------------------------|---------|
//! | `project_id`                                     | GCS     |
//! | `access_key_id` + `endpoint` / `minio_endpoint`  | MinIO   |
//! | `access_key_id`                                  | S3      |

use crate::bucket::{Bucket, BucketOptions, CopyDest};
use crate::error::{StorageError, StorageResult};
use crate::minio::{self, MinioConfig};
use crate::s3::{S3Config, S3Driver};
use crate::stream::{ObjectReader, ObjectWriter};
use crate::types::{BackendType, BucketFile, BucketFileDeleted, BucketRef, ListArg, ListResult};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[cfg(feature = "gcs")]
use crate::gcs::{GcsConfig, GcsDriver};

/// Typed bucket configuration
#[derive(Debug, Clone)]
pub enum BackendConfig {
    /// Amazon S3
    S3(S3Config),
    /// MinIO or another S3-compatible server
    Minio(MinioConfig),
    /// Google Cloud Storage
    #[cfg(feature = "gcs")]
    Gcs(GcsConfig),
}

fn has_value(map: &serde_json::Map<String, Value>, key: &str) -> bool {
    map.get(key).is_some_and(|value| !value.is_null())
}

fn parse<T: DeserializeOwned>(value: &Value, backend: &str) -> StorageResult<T> {
    serde_json::from_value(value.clone())
        .map_err(|e| StorageError::invalid_config(format!("invalid {backend} bucket config: {e}")))
}

impl BackendConfig {
    /// Detect the backend from the fields present in `value`
    pub fn from_value(value: &Value) -> StorageResult<Self> {
        let Some(map) = value.as_object() else {
            return Err(StorageError::invalid_config("bucket config must be an object"));
        };

        if has_value(map, "project_id") {
            return Self::gcs(value);
        }

        if has_value(map, "access_key_id") {
            if has_value(map, "endpoint") || has_value(map, "minio_endpoint") {
                return parse(value, "MinIO").map(BackendConfig::Minio);
            }
            return parse(value, "S3").map(BackendConfig::S3);
        }

        Err(StorageError::invalid_config(
            "unknown bucket config: expected `project_id` (GCS) or `access_key_id` (S3/MinIO)",
        ))
    }

    #[cfg(feature = "gcs")]
    fn gcs(value: &Value) -> StorageResult<Self> {
        parse(value, "GCS").map(BackendConfig::Gcs)
    }

    #[cfg(not(feature = "gcs"))]
    fn gcs(_value: &Value) -> StorageResult<Self> {
        Err(StorageError::invalid_config(
            "GCS bucket config given but the `gcs` feature is disabled",
        ))
    }

    /// Backend this configuration connects to
    pub fn backend(&self) -> BackendType {
        match self {
            BackendConfig::S3(_) => BackendType::S3,
            BackendConfig::Minio(_) => BackendType::Minio,
            #[cfg(feature = "gcs")]
            BackendConfig::Gcs(_) => BackendType::Gcs,
        }
    }

    /// Name of the configured bucket
    pub fn bucket_name(&self) -> &str {
        match self {
            BackendConfig::S3(config) => &config.bucket_name,
            BackendConfig::Minio(config) => &config.bucket_name,
            #[cfg(feature = "gcs")]
            BackendConfig::Gcs(config) => &config.bucket_name,
        }
    }

    /// Connect the driver and wrap it in a bucket façade
    pub async fn connect(self, options: BucketOptions) -> StorageResult<AnyBucket> {
        let backend = self.backend();
        let bucket = match self {
            BackendConfig::S3(config) => {
                AnyBucket::Aws(Bucket::with_options(S3Driver::connect(config).await?, options))
            }
            BackendConfig::Minio(config) => {
                AnyBucket::Aws(Bucket::with_options(minio::connect(config).await?, options))
            }
            #[cfg(feature = "gcs")]
            BackendConfig::Gcs(config) => {
                AnyBucket::Gcs(Bucket::with_options(GcsDriver::connect(config).await?, options))
            }
        };
        info!(backend = %backend, bucket = %bucket.name(), "Connected bucket");
        Ok(bucket)
    }
}

/// Connect the bucket described by `config`
pub async fn get_bucket(config: &Value, options: BucketOptions) -> StorageResult<AnyBucket> {
    BackendConfig::from_value(config)?.connect(options).await
}

/// A bucket façade over whichever driver the configuration selected
#[derive(Debug)]
pub enum AnyBucket {
    /// S3 or MinIO
    Aws(Bucket<S3Driver>),
    /// Google Cloud Storage
    #[cfg(feature = "gcs")]
    Gcs(Bucket<GcsDriver>),
}

macro_rules! dispatch {
    ($self:ident, $bucket:ident => $call:expr) => {
        match $self {
            AnyBucket::Aws($bucket) => $call,
            #[cfg(feature = "gcs")]
            AnyBucket::Gcs($bucket) => $call,
        }
    };
}

impl AnyBucket {
    /// Handle carried by every file this bucket produces
    pub fn handle(&self) -> &BucketRef {
        dispatch!(self, b => b.handle())
    }

    /// Backend identity tag
    pub fn backend(&self) -> BackendType {
        dispatch!(self, b => b.backend())
    }

    /// Bucket name
    pub fn name(&self) -> &str {
        dispatch!(self, b => b.name())
    }

    /// See [`Bucket::exists`]
    pub async fn exists(&self, path: &str) -> StorageResult<bool> {
        dispatch!(self, b => b.exists(path).await)
    }

    /// See [`Bucket::get_file`]
    pub async fn get_file(&self, path: &str) -> StorageResult<Option<BucketFile>> {
        dispatch!(self, b => b.get_file(path).await)
    }

    /// See [`Bucket::list`]
    pub async fn list(&self, arg: impl Into<ListArg>) -> StorageResult<ListResult> {
        let arg = arg.into();
        dispatch!(self, b => b.list(arg).await)
    }

    /// See [`Bucket::list_files`]
    pub async fn list_files(&self, arg: impl Into<ListArg>) -> StorageResult<Vec<BucketFile>> {
        let arg = arg.into();
        dispatch!(self, b => b.list_files(arg).await)
    }

    /// See [`Bucket::copy`]
    pub async fn copy<'a>(
        &self,
        prefix_or_glob: &str,
        dest: impl Into<CopyDest<'a>>,
    ) -> StorageResult<()> {
        let dest = dest.into();
        dispatch!(self, b => b.copy(prefix_or_glob, dest).await)
    }

    /// See [`Bucket::copy_with_cancel`]
    pub async fn copy_with_cancel<'a>(
        &self,
        prefix_or_glob: &str,
        dest: impl Into<CopyDest<'a>>,
        cancel: &CancellationToken,
    ) -> StorageResult<()> {
        let dest = dest.into();
        dispatch!(self, b => b.copy_with_cancel(prefix_or_glob, dest, cancel).await)
    }

    /// See [`Bucket::download`]
    pub async fn download(
        &self,
        prefix_or_glob: &str,
        local_dest: &str,
    ) -> StorageResult<Vec<BucketFile>> {
        dispatch!(self, b => b.download(prefix_or_glob, local_dest).await)
    }

    /// See [`Bucket::download_with_cancel`]
    pub async fn download_with_cancel(
        &self,
        prefix_or_glob: &str,
        local_dest: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<Vec<BucketFile>> {
        dispatch!(self, b => b.download_with_cancel(prefix_or_glob, local_dest, cancel).await)
    }

    /// See [`Bucket::download_as_text`]
    pub async fn download_as_text(&self, path: &str) -> StorageResult<String> {
        dispatch!(self, b => b.download_as_text(path).await)
    }

    /// See [`Bucket::upload`]
    pub async fn upload(&self, local: &str, remote: &str) -> StorageResult<Vec<BucketFile>> {
        dispatch!(self, b => b.upload(local, remote).await)
    }

    /// See [`Bucket::upload_with_cancel`]
    pub async fn upload_with_cancel(
        &self,
        local: &str,
        remote: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<Vec<BucketFile>> {
        dispatch!(self, b => b.upload_with_cancel(local, remote, cancel).await)
    }

    /// See [`Bucket::upload_content`]
    pub async fn upload_content(&self, path: &str, content: impl Into<Bytes>) -> StorageResult<()> {
        let content = content.into();
        dispatch!(self, b => b.upload_content(path, content).await)
    }

    /// See [`Bucket::create_read_stream`]
    pub async fn create_read_stream(&self, path: &str) -> StorageResult<ObjectReader> {
        dispatch!(self, b => b.create_read_stream(path).await)
    }

    /// See [`Bucket::create_write_stream`]
    pub async fn create_write_stream(&self, path: &str) -> StorageResult<ObjectWriter> {
        dispatch!(self, b => b.create_write_stream(path).await)
    }

    /// See [`Bucket::delete`]
    pub async fn delete(&self, path: &str) -> StorageResult<bool> {
        dispatch!(self, b => b.delete(path).await)
    }

    /// See [`Bucket::delete_all`]
    pub async fn delete_all(&self, files: &[BucketFile]) -> StorageResult<Vec<BucketFileDeleted>> {
        dispatch!(self, b => b.delete_all(files).await)
    }

    /// See [`Bucket::delete_all_with_cancel`]
    pub async fn delete_all_with_cancel(
        &self,
        files: &[BucketFile],
        cancel: &CancellationToken,
    ) -> StorageResult<Vec<BucketFileDeleted>> {
        dispatch!(self, b => b.delete_all_with_cancel(files, cancel).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detects_s3() {
        let config = BackendConfig::from_value(&json!({
            "bucketName": "media",
            "access_key_id": "AKIA",
            "access_key_secret": "secret",
            "region": "eu-west-1"
        }))
        .unwrap();
        assert_eq!(config.backend(), BackendType::S3);
    }

    #[test]
    fn test_detects_minio_before_s3() {
        let config = BackendConfig::from_value(&json!({
            "bucketName": "media",
            "access_key_id": "minioadmin",
            "access_key_secret": "minioadmin",
            "minio_endpoint": "http://localhost:9000"
        }))
        .unwrap();
        assert_eq!(config.backend(), BackendType::Minio);
        assert_eq!(config.bucket_name(), "media");
        assert!(matches!(config, BackendConfig::Minio(ref minio) if !minio.public_read));

        let config = BackendConfig::from_value(&json!({
            "bucketName": "media",
            "access_key_id": "minioadmin",
            "access_key_secret": "minioadmin",
            "minio_endpoint": "http://localhost:9000",
            "public_read": true
        }))
        .unwrap();
        assert!(matches!(config, BackendConfig::Minio(ref minio) if minio.public_read));
    }

    #[test]
    fn test_null_endpoint_is_s3() {
        let config = BackendConfig::from_value(&json!({
            "bucketName": "media",
            "access_key_id": "AKIA",
            "access_key_secret": "secret",
            "endpoint": null
        }))
        .unwrap();
        assert_eq!(config.backend(), BackendType::S3);
    }

    #[cfg(feature = "gcs")]
    #[test]
    fn test_detects_gcs() {
        let config = BackendConfig::from_value(&json!({
            "bucketName": "media",
            "project_id": "proj",
            "client_email": "svc@proj.iam.gserviceaccount.com",
            "private_key": "key"
        }))
        .unwrap();
        assert_eq!(config.backend(), BackendType::Gcs);
    }

    #[test]
    fn test_unknown_shape() {
        let err = BackendConfig::from_value(&json!({ "bucketName": "media" })).unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));

        let err = BackendConfig::from_value(&json!("s3://media")).unwrap_err();
        assert!(matches!(err, StorageError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_required_field() {
        let err = BackendConfig::from_value(&json!({ "access_key_id": "AKIA" })).unwrap_err();
        assert!(err.to_string().contains("S3"));
    }
}
