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

//! In-memory driver for testing
//!
//! Keeps every bucket of one "account" in a shared `Arc<RwLock<BTreeMap>>`, so
//! drivers created with [`MemoryDriver::sibling`] can copy between each other
//! the way two buckets of one S3 account can. Listing follows S3 semantics:
//! keys come back in lexicographic order, delimiter mode rolls keys up into
//! common prefixes, the page limit counts files and prefixes together, and
//! the marker is the last entry of the previous page.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cloud_bucket_storage::{Bucket, MemoryDriver};
//!
//! # async fn run() -> cloud_bucket_storage::StorageResult<()> {
//! let bucket = Bucket::new(MemoryDriver::new("test-bucket"));
//! bucket.upload_content("docs/readme.txt", "hello").await?;
//! assert!(bucket.exists("docs/readme.txt").await?);
//! # Ok(())
//! # }
//! ```

use crate::driver::Driver;
use crate::error::{StorageError, StorageResult};
use crate::stream::{ObjectReader, ObjectWriter};
use crate::types::{normalize_dirs, BackendType, BucketRef, FileInfo, ListQuery, RawListing};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::sync::RwLock;
use tracing::debug;

/// Page size when the query sets no limit, matching S3's default
pub const DEFAULT_PAGE_SIZE: usize = 1000;

type Store = BTreeMap<String, BTreeMap<String, MemoryObject>>;

/// Object stored by [`MemoryDriver`]
#[derive(Debug, Clone)]
pub struct MemoryObject {
    /// Object key
    pub key: String,
    /// Content
    pub data: Bytes,
    /// Content type given at upload
    pub content_type: Option<String>,
    /// Time of the last write
    pub updated: DateTime<Utc>,
}

/// In-memory driver
///
/// Thread-safe; clones share the same store and bucket.
#[derive(Clone)]
pub struct MemoryDriver {
    bucket: String,
    backend: BackendType,
    store: Arc<RwLock<Store>>,
}

impl MemoryDriver {
    /// Create a driver for `bucket` in a fresh, empty store
    pub fn new(bucket: impl Into<String>) -> Self {
        Self::with_backend(bucket, BackendType::Memory)
    }

    /// Create a driver reporting `backend` as its identity
    ///
    /// Lets tests exercise cross-backend checks without a network.
    pub fn with_backend(bucket: impl Into<String>, backend: BackendType) -> Self {
        MemoryDriver {
            bucket: bucket.into(),
            backend,
            store: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Driver for another bucket of the same store and backend
    pub fn sibling(&self, bucket: impl Into<String>) -> Self {
        MemoryDriver {
            bucket: bucket.into(),
            backend: self.backend,
            store: Arc::clone(&self.store),
        }
    }

    /// Number of objects in this bucket
    pub async fn len(&self) -> usize {
        self.store
            .read()
            .await
            .get(&self.bucket)
            .map_or(0, BTreeMap::len)
    }

    /// Whether this bucket holds no objects
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Sorted keys of this bucket
    pub async fn keys(&self) -> Vec<String> {
        self.store
            .read()
            .await
            .get(&self.bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove every object of this bucket
    pub async fn clear(&self) {
        self.store.write().await.remove(&self.bucket);
    }

    async fn get(&self, path: &str) -> Option<MemoryObject> {
        self.store
            .read()
            .await
            .get(&self.bucket)
            .and_then(|objects| objects.get(path))
            .cloned()
    }

    async fn put(
        &self,
        bucket: &str,
        path: &str,
        data: Bytes,
        content_type: Option<String>,
    ) -> MemoryObject {
        let object = MemoryObject {
            key: path.to_string(),
            data,
            content_type,
            updated: Utc::now(),
        };
        self.store
            .write()
            .await
            .entry(bucket.to_string())
            .or_default()
            .insert(path.to_string(), object.clone());
        object
    }

    fn check_path(path: &str) -> StorageResult<()> {
        if path.is_empty() {
            return Err(StorageError::invalid_argument("object path cannot be empty"));
        }
        Ok(())
    }
}

impl fmt::Debug for MemoryDriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDriver")
            .field("bucket", &self.bucket)
            .field("backend", &self.backend)
            .finish()
    }
}

enum Entry {
    File(MemoryObject),
    Dir(String),
}

impl Entry {
    fn name(&self) -> &str {
        match self {
            Entry::File(object) => &object.key,
            Entry::Dir(prefix) => prefix,
        }
    }
}

#[async_trait]
impl Driver for MemoryDriver {
    type Object = MemoryObject;

    fn backend(&self) -> BackendType {
        self.backend
    }

    fn bucket_name(&self) -> &str {
        &self.bucket
    }

    fn to_canonical_file(&self, object: &MemoryObject) -> FileInfo {
        FileInfo {
            path: object.key.clone(),
            size: Some(object.data.len() as u64),
            updated: Some(object.updated.to_rfc3339_opts(SecondsFormat::Millis, true)),
            content_type: object.content_type.clone(),
        }
    }

    fn remote_path<'a>(&self, object: &'a MemoryObject) -> &'a str {
        &object.key
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        Self::check_path(path)?;
        Ok(self.get(path).await.is_some())
    }

    async fn fetch_metadata(&self, path: &str) -> StorageResult<Option<MemoryObject>> {
        Self::check_path(path)?;
        Ok(self.get(path).await)
    }

    async fn list_raw(&self, query: &ListQuery) -> StorageResult<RawListing<MemoryObject>> {
        let prefix = query.prefix.as_deref().unwrap_or("");
        let limit = query
            .limit
            .filter(|limit| *limit > 0)
            .map_or(DEFAULT_PAGE_SIZE, |limit| limit as usize);

        let mut entries: Vec<Entry> = Vec::new();
        {
            let store = self.store.read().await;
            if let Some(objects) = store.get(&self.bucket) {
                for (key, object) in objects.range(prefix.to_string()..) {
                    if !key.starts_with(prefix) {
                        break;
                    }
                    if query.directory {
                        if let Some(idx) = key[prefix.len()..].find('/') {
                            let dir = &key[..prefix.len() + idx + 1];
                            let seen = matches!(entries.last(), Some(Entry::Dir(last)) if last == dir);
                            if !seen {
                                entries.push(Entry::Dir(dir.to_string()));
                            }
                            continue;
                        }
                    }
                    entries.push(Entry::File(object.clone()));
                }
            }
        }

        if let Some(marker) = query.marker.as_deref() {
            entries.retain(|entry| entry.name() > marker);
        }

        let next_marker = if entries.len() > limit {
            entries.truncate(limit);
            entries.last().map(|entry| entry.name().to_string())
        } else {
            None
        };

        let mut items = Vec::new();
        let mut dirs = Vec::new();
        for entry in entries {
            match entry {
                Entry::File(object) => items.push(object),
                Entry::Dir(prefix) => dirs.push(prefix),
            }
        }

        debug!(
            bucket = %self.bucket,
            prefix = %prefix,
            files = items.len(),
            dirs = dirs.len(),
            "Listed in-memory objects"
        );

        Ok(RawListing {
            items,
            dirs: normalize_dirs(dirs),
            next_marker,
        })
    }

    async fn fetch_content_as_text(&self, path: &str) -> StorageResult<String> {
        Self::check_path(path)?;
        let object = self
            .get(path)
            .await
            .ok_or_else(|| StorageError::not_found(path))?;
        String::from_utf8(object.data.to_vec())
            .map_err(|e| StorageError::backend(format!("object '{path}' is not UTF-8"), e))
    }

    async fn download_to_local_file(
        &self,
        object: &MemoryObject,
        local_path: &Path,
    ) -> StorageResult<()> {
        let current = self
            .get(&object.key)
            .await
            .ok_or_else(|| StorageError::not_found(object.key.as_str()))?;
        tokio::fs::write(local_path, &current.data).await?;
        Ok(())
    }

    async fn upload_local_file(
        &self,
        local_path: &Path,
        remote_path: &str,
        content_type: Option<&str>,
    ) -> StorageResult<MemoryObject> {
        Self::check_path(remote_path)?;
        let data = tokio::fs::read(local_path).await?;
        Ok(self
            .put(
                &self.bucket,
                remote_path,
                Bytes::from(data),
                content_type.map(str::to_string),
            )
            .await)
    }

    async fn upload_content(
        &self,
        path: &str,
        content: Bytes,
        content_type: Option<&str>,
    ) -> StorageResult<()> {
        Self::check_path(path)?;
        self.put(&self.bucket, path, content, content_type.map(str::to_string))
            .await;
        Ok(())
    }

    async fn copy_within_backend(
        &self,
        object: &MemoryObject,
        dest_bucket: &BucketRef,
        dest_path: &str,
    ) -> StorageResult<()> {
        if dest_bucket.backend() != self.backend {
            return Err(StorageError::UnsupportedCrossBackend(self.backend));
        }
        Self::check_path(dest_path)?;
        let current = self
            .get(&object.key)
            .await
            .ok_or_else(|| StorageError::not_found(object.key.as_str()))?;
        self.put(dest_bucket.name(), dest_path, current.data, current.content_type)
            .await;
        Ok(())
    }

    async fn delete_object(&self, path: &str) -> StorageResult<bool> {
        Self::check_path(path)?;
        let removed = self
            .store
            .write()
            .await
            .get_mut(&self.bucket)
            .and_then(|objects| objects.remove(path));
        Ok(removed.is_some())
    }

    async fn open_read_stream(&self, path: &str) -> StorageResult<ObjectReader> {
        Self::check_path(path)?;
        let object = self
            .get(path)
            .await
            .ok_or_else(|| StorageError::not_found(path))?;
        Ok(Box::pin(Cursor::new(object.data)))
    }

    async fn open_write_stream(
        &self,
        path: &str,
        content_type: Option<&str>,
    ) -> StorageResult<ObjectWriter> {
        Self::check_path(path)?;
        let driver = self.clone();
        let path = path.to_string();
        let content_type = content_type.map(str::to_string);

        Ok(ObjectWriter::spawn(move |mut source| async move {
            let mut data = Vec::new();
            source.read_to_end(&mut data).await?;
            driver
                .put(&driver.bucket, &path, Bytes::from(data), content_type)
                .await;
            Ok(())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded(keys: &[&str]) -> MemoryDriver {
        let driver = MemoryDriver::new("test-bucket");
        for key in keys {
            driver
                .upload_content(key, Bytes::from_static(b"data"), None)
                .await
                .unwrap();
        }
        driver
    }

    fn query(prefix: &str) -> ListQuery {
        ListQuery {
            prefix: Some(prefix.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_list_flat_returns_sorted_keys_below_prefix() {
        let driver = seeded(&["b/2.txt", "a.txt", "b/1.txt", "b/sub/3.txt"]).await;
        let listing = driver.list_raw(&query("b/")).await.unwrap();
        let keys: Vec<_> = listing.items.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["b/1.txt", "b/2.txt", "b/sub/3.txt"]);
        assert_eq!(listing.dirs, None);
        assert_eq!(listing.next_marker, None);
    }

    #[tokio::test]
    async fn test_list_directory_rolls_up_prefixes() {
        let driver = seeded(&["b/1.txt", "b/sub/2.txt", "b/sub/3.txt", "b/zz/4.txt"]).await;
        let q = ListQuery {
            directory: true,
            ..query("b/")
        };
        let listing = driver.list_raw(&q).await.unwrap();
        assert_eq!(listing.items.len(), 1);
        assert_eq!(
            listing.dirs,
            Some(vec!["b/sub/".to_string(), "b/zz/".to_string()])
        );
    }

    #[tokio::test]
    async fn test_list_directory_without_prefixes_reports_none() {
        let driver = seeded(&["b/1.txt", "b/2.txt"]).await;
        let q = ListQuery {
            directory: true,
            ..query("b/")
        };
        assert_eq!(driver.list_raw(&q).await.unwrap().dirs, None);
    }

    #[tokio::test]
    async fn test_list_limit_and_marker() {
        let driver = seeded(&["k/1", "k/2", "k/3", "k/4", "k/5"]).await;
        let first = driver
            .list_raw(&ListQuery {
                limit: Some(2),
                ..query("k/")
            })
            .await
            .unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_marker.as_deref(), Some("k/2"));

        let second = driver
            .list_raw(&ListQuery {
                limit: Some(2),
                marker: first.next_marker,
                ..query("k/")
            })
            .await
            .unwrap();
        let keys: Vec<_> = second.items.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["k/3", "k/4"]);
    }

    #[tokio::test]
    async fn test_delete_reports_absence() {
        let driver = seeded(&["gone.txt"]).await;
        assert!(driver.delete_object("gone.txt").await.unwrap());
        assert!(!driver.delete_object("gone.txt").await.unwrap());
        assert!(driver.is_empty().await);
    }

    #[tokio::test]
    async fn test_sibling_copy_shares_store() {
        let source = seeded(&["a.txt"]).await;
        let target = source.sibling("archive");
        let target_ref = BucketRef::issue(target.backend(), target.bucket_name());

        let object = source.fetch_metadata("a.txt").await.unwrap().unwrap();
        source
            .copy_within_backend(&object, &target_ref, "2024/a.txt")
            .await
            .unwrap();

        assert_eq!(target.keys().await, vec!["2024/a.txt".to_string()]);
        assert_eq!(source.len().await, 1);
    }

    #[tokio::test]
    async fn test_copy_rejects_other_backend() {
        let source = seeded(&["a.txt"]).await;
        let object = source.fetch_metadata("a.txt").await.unwrap().unwrap();
        let foreign = BucketRef::issue(BackendType::Gcs, "elsewhere");

        let err = source
            .copy_within_backend(&object, &foreign, "a.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::UnsupportedCrossBackend(BackendType::Memory)));
    }

    #[tokio::test]
    async fn test_empty_path_rejected() {
        let driver = MemoryDriver::new("test-bucket");
        assert!(matches!(
            driver.exists("").await,
            Err(StorageError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_debug_impl() {
        let driver = MemoryDriver::new("test-bucket");
        let debug = format!("{:?}", driver);
        assert!(debug.contains("MemoryDriver"));
        assert!(debug.contains("test-bucket"));
    }
}
