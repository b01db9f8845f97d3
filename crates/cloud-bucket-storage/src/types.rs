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

//! Canonical data model shared by every driver and the bucket façade

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Backend identity tag
///
/// Every cross-backend check compares these tags by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    /// Amazon S3
    S3,
    /// Google Cloud Storage
    Gcs,
    /// Self-hosted S3-compatible store
    Minio,
    /// In-process store used for tests
    Memory,
}

impl BackendType {
    /// URI scheme of the backend (`s3`, `gs`, `minio`, `mem`)
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::S3 => "s3",
            BackendType::Gcs => "gs",
            BackendType::Minio => "minio",
            BackendType::Memory => "mem",
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

static NEXT_BUCKET_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, non-owning handle identifying one bucket façade
///
/// Files carry this handle so operations can verify ownership. Two handles
/// are equal only when they were issued for the same façade instance.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BucketRef {
    id: u64,
    backend: BackendType,
    name: Arc<str>,
}

impl BucketRef {
    /// Issue a fresh handle for a new façade
    pub fn issue(backend: BackendType, name: &str) -> Self {
        BucketRef {
            id: NEXT_BUCKET_ID.fetch_add(1, Ordering::Relaxed),
            backend,
            name: Arc::from(name),
        }
    }

    /// Backend the bucket lives on
    pub fn backend(&self) -> BackendType {
        self.backend
    }

    /// Bucket name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `scheme://name/path` form used in log lines and error messages
    pub fn uri(&self, path: &str) -> String {
        format!("{}://{}/{}", self.backend, self.name, path)
    }
}

impl fmt::Debug for BucketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketRef({}://{}#{})", self.backend, self.name, self.id)
    }
}

impl fmt::Display for BucketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.backend, self.name)
    }
}

/// Backend-neutral view of one remote object, before it is bound to a bucket
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInfo {
    /// Object path within the bucket
    pub path: String,
    /// Size in bytes, when reported
    pub size: Option<u64>,
    /// Last modification time, ISO-8601 UTC with milliseconds
    pub updated: Option<String>,
    /// Content type, when reported
    pub content_type: Option<String>,
}

/// Canonical description of a remote object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketFile {
    /// Bucket that produced this file
    pub bucket: BucketRef,
    /// Object path within the bucket
    pub path: String,
    /// Size in bytes, when reported
    pub size: Option<u64>,
    /// Last modification time, ISO-8601 UTC with milliseconds
    pub updated: Option<String>,
    /// Content type, when reported
    pub content_type: Option<String>,
    /// Local file written by a download
    pub local_path: Option<PathBuf>,
}

impl BucketFile {
    /// Bind a driver-produced [`FileInfo`] to its bucket
    pub fn from_info(bucket: BucketRef, info: FileInfo) -> Self {
        BucketFile {
            bucket,
            path: info.path,
            size: info.size,
            updated: info.updated,
            content_type: info.content_type,
            local_path: None,
        }
    }

    /// `scheme://bucket/path` form of this file
    pub fn uri(&self) -> String {
        self.bucket.uri(&self.path)
    }
}

/// Result of one item of [`Bucket::delete_all`](crate::Bucket::delete_all)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketFileDeleted {
    /// The file the delete was requested for
    pub file: BucketFile,
    /// `false` when the object was already absent
    pub deleted: bool,
}

/// Options accepted by listing operations
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Literal prefix or glob expression
    pub prefix: Option<String>,
    /// Group keys by the `/` delimiter and report common prefixes as `dirs`
    pub directory: bool,
    /// Opaque continuation marker from a previous page
    pub marker: Option<String>,
    /// Maximum number of entries (files and prefixes) in one page
    pub limit: Option<u32>,
}

impl ListOptions {
    /// Options listing everything below `prefix`
    pub fn prefix(prefix: impl Into<String>) -> Self {
        ListOptions {
            prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    /// Enable delimiter mode
    pub fn directory(mut self, directory: bool) -> Self {
        self.directory = directory;
        self
    }

    /// Cap the page size
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Resume after a previous page
    pub fn marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }
}

/// Argument of listing operations: a bare prefix/glob string or full options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListArg {
    /// Prefix or glob expression
    Prefix(String),
    /// Full listing options
    Options(ListOptions),
}

impl Default for ListArg {
    fn default() -> Self {
        ListArg::Options(ListOptions::default())
    }
}

impl From<&str> for ListArg {
    fn from(value: &str) -> Self {
        ListArg::Prefix(value.to_string())
    }
}

impl From<String> for ListArg {
    fn from(value: String) -> Self {
        ListArg::Prefix(value)
    }
}

impl From<&String> for ListArg {
    fn from(value: &String) -> Self {
        ListArg::Prefix(value.clone())
    }
}

impl From<ListOptions> for ListArg {
    fn from(value: ListOptions) -> Self {
        ListArg::Options(value)
    }
}

/// Listing request as handed to a driver; globs have already been split off
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Literal key prefix
    pub prefix: Option<String>,
    /// Delimiter mode
    pub directory: bool,
    /// Continuation marker
    pub marker: Option<String>,
    /// Page size
    pub limit: Option<u32>,
}

/// One page of listing results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResult {
    /// Matching files
    pub files: Vec<BucketFile>,
    /// Common prefixes; `None` when not in directory mode or when there are none
    pub dirs: Option<Vec<String>>,
    /// Marker for the next page, `None` on the last page
    pub next_marker: Option<String>,
}

/// One page of backend-native listing results
#[derive(Debug, Clone)]
pub struct RawListing<O> {
    /// Backend-native objects
    pub items: Vec<O>,
    /// Common prefixes, normalized with [`normalize_dirs`]
    pub dirs: Option<Vec<String>>,
    /// Marker for the next page
    pub next_marker: Option<String>,
}

/// Collapse an empty prefix list to `None`
pub fn normalize_dirs(dirs: Vec<String>) -> Option<Vec<String>> {
    if dirs.is_empty() {
        None
    } else {
        Some(dirs)
    }
}

/// Format a backend timestamp as `YYYY-MM-DDTHH:MM:SS.mmmZ`
pub fn iso8601(secs: i64, nanos: u32) -> Option<String> {
    DateTime::<Utc>::from_timestamp(secs, nanos)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}
