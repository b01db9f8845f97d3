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

//! AWS S3 driver
//!
//! Implements [`Driver`] on top of `aws-sdk-s3`. The same driver serves
//! self-hosted S3-compatible stores; see [`crate::minio`] for how those are
//! connected. The backend tag it reports decides which buckets it may copy to.
//!
//! # Features
//!
//! - **Static credentials** from the bucket configuration
//! - **Delimiter listings** with continuation tokens as opaque markers
//! - **Server-side copy** between buckets of one backend
//! - **Streaming writes**: one `PutObject` for small payloads, a sequential
//!   multipart upload otherwise, aborted when any part fails
//!
//! # Examples
//!
//! ```rust,no_run
//! use cloud_bucket_storage::s3::{S3Config, S3Driver};
//! use cloud_bucket_storage::Bucket;
//!
//! # async fn run() -> cloud_bucket_storage::StorageResult<()> {
//! let config = S3Config::new("my-bucket", "AKIA...", "secret");
//! let bucket = Bucket::new(S3Driver::connect(config).await?);
//! let page = bucket.list("reports/2024/").await?;
//! println!("{} reports", page.files.len());
//! # Ok(())
//! # }
//! ```

use crate::driver::Driver;
use crate::error::{StorageError, StorageResult};
use crate::stream::{ObjectReader, ObjectWriter};
use crate::types::{iso8601, normalize_dirs, BackendType, BucketRef, FileInfo, ListQuery, RawListing};
use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime as AwsDateTime};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;
use bytes::Bytes;
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tracing::{debug, warn};

/// Region used when the configuration names none
pub const DEFAULT_REGION: &str = "us-east-1";

/// Smallest part S3 accepts in a multipart upload (except the last)
pub const MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// Default part size of streaming uploads
pub const DEFAULT_PART_SIZE: usize = 8 * 1024 * 1024;

pub(crate) fn default_part_size() -> usize {
    DEFAULT_PART_SIZE
}

/// Configuration of an S3 bucket
#[derive(Clone, Deserialize)]
pub struct S3Config {
    /// Bucket name
    #[serde(alias = "bucketName", alias = "bucket")]
    pub bucket_name: String,

    /// Access key ID
    pub access_key_id: String,

    /// Secret access key
    #[serde(alias = "secret_access_key")]
    pub access_key_secret: String,

    /// Region (default: `us-east-1`)
    #[serde(default)]
    pub region: Option<String>,

    /// Part size of streaming uploads in bytes (minimum 5 MiB)
    #[serde(default = "default_part_size")]
    pub part_size: usize,
}

impl S3Config {
    /// Configuration with static credentials and default settings
    pub fn new(
        bucket_name: impl Into<String>,
        access_key_id: impl Into<String>,
        access_key_secret: impl Into<String>,
    ) -> Self {
        S3Config {
            bucket_name: bucket_name.into(),
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
            region: None,
            part_size: DEFAULT_PART_SIZE,
        }
    }

    /// Set the region
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket_name", &self.bucket_name)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"***")
            .field("region", &self.region)
            .field("part_size", &self.part_size)
            .finish()
    }
}

/// Backend-native record of an S3 object
#[derive(Debug, Clone)]
pub struct S3Object {
    /// Object key
    pub key: String,
    /// Size in bytes
    pub size: Option<i64>,
    /// Last modification time
    pub last_modified: Option<AwsDateTime>,
    /// Content type (only reported by metadata lookups)
    pub content_type: Option<String>,
}

/// Driver for S3 and S3-compatible buckets
///
/// Cheap to clone; clones share the SDK client.
#[derive(Clone)]
pub struct S3Driver {
    client: Client,
    bucket: String,
    backend: BackendType,
    part_size: usize,
}

impl S3Driver {
    /// Connect to an AWS S3 bucket and verify it is reachable
    pub async fn connect(config: S3Config) -> StorageResult<Self> {
        if config.bucket_name.is_empty() {
            return Err(StorageError::invalid_config("bucket name cannot be empty"));
        }

        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.access_key_secret.clone(),
            None,
            None,
            "cloud-bucket",
        );
        let region = config
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(credentials)
            .load()
            .await;
        let client = Client::new(&sdk_config);

        client
            .head_bucket()
            .bucket(&config.bucket_name)
            .send()
            .await
            .map_err(|e| {
                sdk_error(format!("cannot access S3 bucket '{}'", config.bucket_name), e)
            })?;

        debug!(
            bucket = %config.bucket_name,
            region = ?sdk_config.region(),
            "Connected to S3 bucket"
        );

        Ok(Self::from_client(
            client,
            config.bucket_name,
            BackendType::S3,
            config.part_size,
        ))
    }

    /// Wrap an already configured client
    pub fn from_client(
        client: Client,
        bucket: impl Into<String>,
        backend: BackendType,
        part_size: usize,
    ) -> Self {
        S3Driver {
            client,
            bucket: bucket.into(),
            backend,
            part_size: part_size.max(MIN_PART_SIZE),
        }
    }

    /// Underlying SDK client
    pub fn client(&self) -> &Client {
        &self.client
    }

    fn check_path(path: &str) -> StorageResult<()> {
        if path.is_empty() {
            return Err(StorageError::invalid_argument("object key cannot be empty"));
        }
        Ok(())
    }

    async fn get_body(&self, path: &str) -> StorageResult<ByteStream> {
        Self::check_path(path)?;
        debug!(bucket = %self.bucket, key = %path, "Getting S3 object");
        match self.client.get_object().bucket(&self.bucket).key(path).send().await {
            Ok(output) => Ok(output.body),
            Err(e) if is_not_found(&e) => Err(StorageError::not_found(path)),
            Err(e) => Err(sdk_error(format!("failed to get '{path}'"), e)),
        }
    }

    async fn put_bytes(
        &self,
        path: &str,
        body: ByteStream,
        content_type: Option<&str>,
    ) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .set_content_type(content_type.map(str::to_string))
            .body(body)
            .send()
            .await
            .map_err(|e| sdk_error(format!("failed to put '{path}'"), e))?;
        Ok(())
    }

    /// Drain `source` into `key`, switching to multipart once a full part is buffered
    async fn upload_stream<R>(
        self,
        key: String,
        content_type: Option<String>,
        mut source: R,
    ) -> StorageResult<()>
    where
        R: AsyncRead + Unpin + Send,
    {
        let first = read_part(&mut source, self.part_size).await?;
        if first.len() < self.part_size {
            debug!(key = %key, size = first.len(), "Writing S3 object in one request");
            return self
                .put_bytes(&key, ByteStream::from(first), content_type.as_deref())
                .await;
        }

        let multipart = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(&key)
            .set_content_type(content_type)
            .send()
            .await
            .map_err(|e| sdk_error(format!("failed to start multipart upload of '{key}'"), e))?;
        let upload_id = multipart
            .upload_id()
            .ok_or_else(|| {
                StorageError::Other(anyhow::anyhow!("no upload ID returned for '{key}'"))
            })?
            .to_string();

        debug!(key = %key, upload_id = %upload_id, "Initiated multipart upload");

        match self.upload_parts(&key, &upload_id, first, &mut source).await {
            Ok(parts) => {
                self.client
                    .complete_multipart_upload()
                    .bucket(&self.bucket)
                    .key(&key)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder()
                            .set_parts(Some(parts))
                            .build(),
                    )
                    .send()
                    .await
                    .map_err(|e| {
                        sdk_error(format!("failed to complete multipart upload of '{key}'"), e)
                    })?;
                debug!(key = %key, "Completed multipart upload");
                Ok(())
            }
            Err(e) => {
                if let Err(abort) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(&self.bucket)
                    .key(&key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    warn!(
                        key = %key,
                        upload_id = %upload_id,
                        error = %DisplayErrorContext(&abort),
                        "Failed to abort multipart upload"
                    );
                }
                Err(e)
            }
        }
    }

    async fn upload_parts<R>(
        &self,
        key: &str,
        upload_id: &str,
        first: Vec<u8>,
        source: &mut R,
    ) -> StorageResult<Vec<CompletedPart>>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut parts = Vec::new();
        let mut part_number: i32 = 1;
        let mut chunk = first;

        loop {
            debug!(key = %key, part = part_number, size = chunk.len(), "Uploading part");
            let response = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk))
                .send()
                .await
                .map_err(|e| sdk_error(format!("failed to upload part {part_number} of '{key}'"), e))?;

            let e_tag = response.e_tag().ok_or_else(|| {
                StorageError::Other(anyhow::anyhow!("no ETag returned for part {part_number}"))
            })?;
            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(e_tag)
                    .build(),
            );

            chunk = read_part(source, self.part_size).await?;
            if chunk.is_empty() {
                break;
            }
            part_number += 1;
        }
        Ok(parts)
    }
}

impl fmt::Debug for S3Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Driver")
            .field("bucket", &self.bucket)
            .field("backend", &self.backend)
            .field("part_size", &self.part_size)
            .finish()
    }
}

async fn read_part<R>(source: &mut R, size: usize) -> StorageResult<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(size);
    source.take(size as u64).read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Whether an SDK error means the object (or bucket) does not exist
pub(crate) fn is_not_found<E>(err: &SdkError<E, HttpResponse>) -> bool
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    if err
        .raw_response()
        .is_some_and(|response| response.status().as_u16() == 404)
    {
        return true;
    }
    matches!(err.code(), Some("NoSuchKey" | "NotFound" | "NoSuchBucket"))
}

pub(crate) fn sdk_error<E>(message: String, err: SdkError<E, HttpResponse>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StorageError::backend(format!("{message}: {}", DisplayErrorContext(&err)), err)
}

#[async_trait]
impl Driver for S3Driver {
    type Object = S3Object;

    fn backend(&self) -> BackendType {
        self.backend
    }

    fn bucket_name(&self) -> &str {
        &self.bucket
    }

    fn to_canonical_file(&self, object: &S3Object) -> FileInfo {
        FileInfo {
            path: object.key.clone(),
            size: object.size.and_then(|size| u64::try_from(size).ok()),
            updated: object
                .last_modified
                .as_ref()
                .and_then(|dt| iso8601(dt.secs(), dt.subsec_nanos())),
            content_type: object.content_type.clone(),
        }
    }

    fn remote_path<'a>(&self, object: &'a S3Object) -> &'a str {
        &object.key
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Ok(self.fetch_metadata(path).await?.is_some())
    }

    async fn fetch_metadata(&self, path: &str) -> StorageResult<Option<S3Object>> {
        Self::check_path(path)?;
        debug!(bucket = %self.bucket, key = %path, "Fetching S3 object metadata");

        match self.client.head_object().bucket(&self.bucket).key(path).send().await {
            Ok(head) => Ok(Some(S3Object {
                key: path.to_string(),
                size: head.content_length(),
                last_modified: head.last_modified().cloned(),
                content_type: head.content_type().map(str::to_string),
            })),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(sdk_error(format!("failed to stat '{path}'"), e)),
        }
    }

    async fn list_raw(&self, query: &ListQuery) -> StorageResult<RawListing<S3Object>> {
        let mut request = self.client.list_objects_v2().bucket(&self.bucket);
        if let Some(prefix) = query.prefix.as_deref().filter(|p| !p.is_empty()) {
            request = request.prefix(prefix);
        }
        if query.directory {
            request = request.delimiter("/");
        }
        if let Some(limit) = query.limit {
            request = request.max_keys(i32::try_from(limit).unwrap_or(i32::MAX));
        }
        if let Some(marker) = query.marker.as_deref() {
            request = request.continuation_token(marker);
        }

        let response = request
            .send()
            .await
            .map_err(|e| sdk_error(format!("failed to list bucket '{}'", self.bucket), e))?;

        let items: Vec<S3Object> = response
            .contents()
            .iter()
            .filter_map(|object| {
                object.key().map(|key| S3Object {
                    key: key.to_string(),
                    size: object.size(),
                    last_modified: object.last_modified().cloned(),
                    content_type: None,
                })
            })
            .collect();
        let dirs: Vec<String> = response
            .common_prefixes()
            .iter()
            .filter_map(|prefix| prefix.prefix().map(str::to_string))
            .collect();

        debug!(
            bucket = %self.bucket,
            prefix = ?query.prefix,
            files = items.len(),
            dirs = dirs.len(),
            "Listed S3 objects"
        );

        Ok(RawListing {
            items,
            dirs: normalize_dirs(dirs),
            next_marker: response.next_continuation_token().map(str::to_string),
        })
    }

    async fn fetch_content_as_text(&self, path: &str) -> StorageResult<String> {
        let body = self.get_body(path).await?;
        let data = body
            .collect()
            .await
            .map_err(|e| StorageError::backend(format!("failed to read '{path}'"), e))?;
        String::from_utf8(data.into_bytes().to_vec())
            .map_err(|e| StorageError::backend(format!("object '{path}' is not UTF-8"), e))
    }

    async fn download_to_local_file(
        &self,
        object: &S3Object,
        local_path: &Path,
    ) -> StorageResult<()> {
        let body = self.get_body(&object.key).await?;
        let mut reader = body.into_async_read();
        let mut file = tokio::fs::File::create(local_path).await?;
        tokio::io::copy(&mut reader, &mut file).await?;
        file.flush().await?;
        Ok(())
    }

    async fn upload_local_file(
        &self,
        local_path: &Path,
        remote_path: &str,
        content_type: Option<&str>,
    ) -> StorageResult<S3Object> {
        Self::check_path(remote_path)?;
        let size = tokio::fs::metadata(local_path).await?.len();
        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            StorageError::backend(format!("cannot read '{}'", local_path.display()), e)
        })?;

        debug!(key = %remote_path, size, "Uploading file to S3");
        self.put_bytes(remote_path, body, content_type).await?;

        Ok(S3Object {
            key: remote_path.to_string(),
            size: i64::try_from(size).ok(),
            last_modified: None,
            content_type: content_type.map(str::to_string),
        })
    }

    async fn upload_content(
        &self,
        path: &str,
        content: Bytes,
        content_type: Option<&str>,
    ) -> StorageResult<()> {
        Self::check_path(path)?;
        self.put_bytes(path, ByteStream::from(content), content_type)
            .await
    }

    async fn copy_within_backend(
        &self,
        object: &S3Object,
        dest_bucket: &BucketRef,
        dest_path: &str,
    ) -> StorageResult<()> {
        if dest_bucket.backend() != self.backend {
            return Err(StorageError::UnsupportedCrossBackend(self.backend));
        }
        Self::check_path(dest_path)?;

        let copy_source = format!("{}/{}", self.bucket, urlencoding::encode(&object.key));
        debug!(source = %copy_source, dest_bucket = %dest_bucket.name(), dest = %dest_path, "Copying S3 object");

        self.client
            .copy_object()
            .copy_source(copy_source)
            .bucket(dest_bucket.name())
            .key(dest_path)
            .send()
            .await
            .map_err(|e| sdk_error(format!("failed to copy '{}' to '{dest_path}'", object.key), e))?;
        Ok(())
    }

    async fn delete_object(&self, path: &str) -> StorageResult<bool> {
        // S3 deletes succeed for missing keys, so absence has to be probed first.
        if !self.exists(path).await? {
            debug!(key = %path, "Object not found, nothing to delete");
            return Ok(false);
        }

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| sdk_error(format!("failed to delete '{path}'"), e))?;
        Ok(true)
    }

    async fn open_read_stream(&self, path: &str) -> StorageResult<ObjectReader> {
        let body = self.get_body(path).await?;
        Ok(Box::pin(body.into_async_read()))
    }

    async fn open_write_stream(
        &self,
        path: &str,
        content_type: Option<&str>,
    ) -> StorageResult<ObjectWriter> {
        Self::check_path(path)?;
        let driver = self.clone();
        let key = path.to_string();
        let content_type = content_type.map(str::to_string);
        Ok(ObjectWriter::spawn(move |source| {
            driver.upload_stream(key, content_type, source)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_original_field_names() {
        let config: S3Config = serde_json::from_value(serde_json::json!({
            "bucketName": "media",
            "access_key_id": "AKIA",
            "access_key_secret": "secret"
        }))
        .unwrap();
        assert_eq!(config.bucket_name, "media");
        assert_eq!(config.region, None);
        assert_eq!(config.part_size, DEFAULT_PART_SIZE);
    }

    fn response(status: u16) -> HttpResponse {
        HttpResponse::new(
            status.try_into().unwrap(),
            aws_sdk_s3::primitives::SdkBody::empty(),
        )
    }

    #[test]
    fn test_not_found_from_status_or_code() {
        use aws_sdk_s3::error::ErrorMetadata;
        use aws_sdk_s3::operation::get_object::GetObjectError;

        let missing = SdkError::service_error(
            GetObjectError::generic(ErrorMetadata::builder().build()),
            response(404),
        );
        assert!(is_not_found(&missing));

        let coded = SdkError::service_error(
            GetObjectError::generic(ErrorMetadata::builder().code("NoSuchKey").build()),
            response(400),
        );
        assert!(is_not_found(&coded));

        let denied = SdkError::service_error(
            GetObjectError::generic(
                ErrorMetadata::builder()
                    .code("AccessDenied")
                    .message("Key not found in policy, access does not exist")
                    .build(),
            ),
            response(403),
        );
        assert!(!is_not_found(&denied));
    }

    #[test]
    fn test_config_debug_masks_secret() {
        let config = S3Config::new("media", "AKIA", "top-secret").with_region("eu-west-1");
        let debug = format!("{:?}", config);
        assert!(debug.contains("media"));
        assert!(debug.contains("***"));
        assert!(!debug.contains("top-secret"));
    }

    #[test]
    fn test_canonical_file_formats_timestamp() {
        let driver = S3Driver::from_client(
            Client::from_conf(
                aws_sdk_s3::config::Builder::new()
                    .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
                    .region(Region::new(DEFAULT_REGION))
                    .build(),
            ),
            "media",
            BackendType::S3,
            0,
        );
        let object = S3Object {
            key: "a/b.txt".to_string(),
            size: Some(42),
            last_modified: Some(AwsDateTime::from_secs(1_577_836_800)),
            content_type: None,
        };

        let info = driver.to_canonical_file(&object);
        assert_eq!(info.path, "a/b.txt");
        assert_eq!(info.size, Some(42));
        assert_eq!(info.updated.as_deref(), Some("2020-01-01T00:00:00.000Z"));
        assert_eq!(driver.part_size, MIN_PART_SIZE);
    }

    #[tokio::test]
    async fn test_read_part_caps_at_size() {
        let data = vec![7u8; 10];
        let mut source: &[u8] = &data;
        let first = read_part(&mut source, 4).await.unwrap();
        let second = read_part(&mut source, 4).await.unwrap();
        let third = read_part(&mut source, 4).await.unwrap();
        let fourth = read_part(&mut source, 4).await.unwrap();
        assert_eq!((first.len(), second.len(), third.len(), fourth.len()), (4, 4, 2, 0));
    }
}
