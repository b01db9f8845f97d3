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

//! Backend driver contract
//!
//! A [`Driver`] owns the vendor client for exactly one bucket and exposes the
//! primitive operations the [`Bucket`](crate::Bucket) façade composes. Drivers
//! deal in their backend-native object type; the façade converts those into
//! [`BucketFile`](crate::BucketFile)s through [`Driver::to_canonical_file`].
//!
//! # Implementation Guide
//!
//! When implementing `Driver`:
//!
//! 1. Use `#[async_trait]` on the impl block
//! 2. Report a clean not-found as `Ok(None)` / `Ok(false)`, never as an error
//! 3. Attach the vendor error as the source of [`StorageError::Backend`](crate::StorageError::Backend)
//! 4. Normalize an empty prefix list with [`normalize_dirs`](crate::types::normalize_dirs)
//! 5. Do not retry; callers decide

use crate::error::StorageResult;
use crate::stream::{ObjectReader, ObjectWriter};
use crate::types::{BackendType, BucketRef, FileInfo, ListQuery, RawListing};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;
use std::path::Path;

/// Primitive operations of one backend bucket
#[async_trait]
pub trait Driver: Send + Sync + Debug {
    /// Backend-native object record
    type Object: Send + Sync + Debug + 'static;

    /// Backend identity tag
    fn backend(&self) -> BackendType;

    /// Name of the bucket this driver is bound to
    fn bucket_name(&self) -> &str;

    /// Backend tag and bucket name
    fn identify(&self) -> (BackendType, &str) {
        (self.backend(), self.bucket_name())
    }

    /// Convert a native object into the backend-neutral view
    fn to_canonical_file(&self, object: &Self::Object) -> FileInfo;

    /// Path of a native object within the bucket
    fn remote_path<'a>(&self, object: &'a Self::Object) -> &'a str;

    /// Whether an object exists at `path`
    async fn exists(&self, path: &str) -> StorageResult<bool>;

    /// Metadata of the object at `path`, `None` when absent
    async fn fetch_metadata(&self, path: &str) -> StorageResult<Option<Self::Object>>;

    /// One page of objects, without glob filtering
    async fn list_raw(&self, query: &ListQuery) -> StorageResult<RawListing<Self::Object>>;

    /// Full content of a text object
    async fn fetch_content_as_text(&self, path: &str) -> StorageResult<String>;

    /// Write the object's content to `local_path`; the parent directory exists
    async fn download_to_local_file(
        &self,
        object: &Self::Object,
        local_path: &Path,
    ) -> StorageResult<()>;

    /// Upload a local file and return the stored object
    async fn upload_local_file(
        &self,
        local_path: &Path,
        remote_path: &str,
        content_type: Option<&str>,
    ) -> StorageResult<Self::Object>;

    /// Store `content` at `path`
    async fn upload_content(
        &self,
        path: &str,
        content: Bytes,
        content_type: Option<&str>,
    ) -> StorageResult<()>;

    /// Server-side copy to `dest_path` in `dest_bucket`, which must share this backend
    async fn copy_within_backend(
        &self,
        object: &Self::Object,
        dest_bucket: &BucketRef,
        dest_path: &str,
    ) -> StorageResult<()>;

    /// Delete the object at `path`; `false` when it was already absent
    async fn delete_object(&self, path: &str) -> StorageResult<bool>;

    /// Stream the object's content
    async fn open_read_stream(&self, path: &str) -> StorageResult<ObjectReader>;

    /// Open a two-phase write stream into `path`
    async fn open_write_stream(
        &self,
        path: &str,
        content_type: Option<&str>,
    ) -> StorageResult<ObjectWriter>;
}
