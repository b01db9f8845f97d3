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

//! Backend-neutral bucket façade
//!
//! [`Bucket`] turns one logical request into zero, one or many driver calls.
//! Multi-item operations (`copy`, `download`, `upload`, `delete_all`) resolve
//! their source first, enforce the single-target rule, then transfer items
//! one after another in listing order and stop at the first failure. Nothing
//! already transferred is rolled back.
//!
//! A destination ending in `/` is a directory: every matched item keeps its
//! path relative to the source's base directory below it. Any other
//! destination names exactly one object, so a source matching several items
//! is rejected with [`StorageError::TooManyMatches`] before anything moves.
//!
//! # Examples
//!
//! ```rust,no_run
//! use cloud_bucket_storage::{Bucket, ListOptions, MemoryDriver};
//!
//! # async fn run() -> cloud_bucket_storage::StorageResult<()> {
//! let bucket = Bucket::new(MemoryDriver::new("media"));
//! bucket.upload("./site/", "www/").await?;
//!
//! let page = bucket
//!     .list(ListOptions::prefix("www/").directory(true).limit(100))
//!     .await?;
//! println!("{} files, dirs: {:?}", page.files.len(), page.dirs);
//!
//! bucket.copy("www/**/*.html", "backup/").await?;
//! bucket.download("backup/", "/tmp/restore/").await?;
//! # Ok(())
//! # }
//! ```

use crate::driver::Driver;
use crate::error::{StorageError, StorageResult};
use crate::local::{content_type_for, ensure_parent_dir, expand_local_source, normalize_local};
use crate::observer::{BucketObserver, NoopObserver, OpEvent, Operation, TracingObserver};
use crate::pathspec::{
    build_full_dest_path, parse_prefix_or_glob, resolve_destination_path, resolve_list_arg,
    GlobMatcher,
};
use crate::stream::{ObjectReader, ObjectWriter};
use crate::types::{
    BackendType, BucketFile, BucketFileDeleted, BucketRef, ListArg, ListQuery, ListResult,
};
use bytes::Bytes;
use std::future::Future;
use std::path::{PathBuf, MAIN_SEPARATOR};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Construction options of a bucket façade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketOptions {
    /// Log one line per transfer through `tracing`
    pub log: bool,
}

/// Destination of a copy
#[derive(Debug, Clone, Copy)]
pub enum CopyDest<'a> {
    /// Path in the source bucket
    Path(&'a str),
    /// Bucket and path of an existing file
    File(&'a BucketFile),
    /// Path in another bucket of the same backend
    Bucket(&'a BucketRef, &'a str),
}

impl<'a> From<&'a str> for CopyDest<'a> {
    fn from(value: &'a str) -> Self {
        CopyDest::Path(value)
    }
}

impl<'a> From<&'a String> for CopyDest<'a> {
    fn from(value: &'a String) -> Self {
        CopyDest::Path(value)
    }
}

impl<'a> From<&'a BucketFile> for CopyDest<'a> {
    fn from(value: &'a BucketFile) -> Self {
        CopyDest::File(value)
    }
}

impl<'a> From<(&'a BucketRef, &'a str)> for CopyDest<'a> {
    fn from((bucket, path): (&'a BucketRef, &'a str)) -> Self {
        CopyDest::Bucket(bucket, path)
    }
}

/// Uniform operations over one remote bucket
#[derive(Debug)]
pub struct Bucket<D: Driver> {
    driver: D,
    handle: BucketRef,
    observer: Arc<dyn BucketObserver>,
}

async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> StorageResult<T>
where
    F: Future<Output = StorageResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(StorageError::Cancelled),
        result = fut => result,
    }
}

fn is_local_dir(path: &str) -> bool {
    path.ends_with('/') || path.ends_with(MAIN_SEPARATOR)
}

impl<D: Driver> Bucket<D> {
    /// Wrap a connected driver with default options
    pub fn new(driver: D) -> Self {
        Self::with_options(driver, BucketOptions::default())
    }

    /// Wrap a connected driver
    pub fn with_options(driver: D, options: BucketOptions) -> Self {
        let observer: Arc<dyn BucketObserver> = if options.log {
            Arc::new(TracingObserver)
        } else {
            Arc::new(NoopObserver)
        };
        let handle = BucketRef::issue(driver.backend(), driver.bucket_name());
        Bucket {
            driver,
            handle,
            observer,
        }
    }

    /// Replace the transfer observer
    pub fn with_observer(mut self, observer: Arc<dyn BucketObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Handle carried by every file this bucket produces
    pub fn handle(&self) -> &BucketRef {
        &self.handle
    }

    /// Backend identity tag
    pub fn backend(&self) -> BackendType {
        self.handle.backend()
    }

    /// Bucket name
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// Underlying driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn wrap(&self, object: &D::Object) -> BucketFile {
        BucketFile::from_info(self.handle.clone(), self.driver.to_canonical_file(object))
    }

    async fn observe<T, F>(&self, event: OpEvent, fut: F) -> StorageResult<T>
    where
        F: Future<Output = StorageResult<T>>,
    {
        self.observer.on_start(&event);
        match fut.await {
            Ok(value) => {
                self.observer.on_success(&event);
                Ok(value)
            }
            Err(e) => {
                self.observer.on_failure(&event, &e);
                Err(e)
            }
        }
    }

    /// Every object matching a prefix or glob, across all pages
    async fn resolve_matches(
        &self,
        prefix_or_glob: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<(Vec<D::Object>, Option<String>)> {
        let spec = parse_prefix_or_glob(Some(prefix_or_glob));
        let matcher = spec.glob.as_deref().map(GlobMatcher::new).transpose()?;
        let mut query = ListQuery {
            prefix: spec.prefix,
            ..Default::default()
        };

        let mut matches = Vec::new();
        loop {
            let page = cancellable(cancel, self.driver.list_raw(&query)).await?;
            matches.extend(page.items.into_iter().filter(|object| {
                matcher
                    .as_ref()
                    .is_none_or(|m| m.is_match(self.driver.remote_path(object)))
            }));
            match page.next_marker {
                Some(marker) => query.marker = Some(marker),
                None => break,
            }
        }

        debug!(
            bucket = %self.handle,
            source = %prefix_or_glob,
            matched = matches.len(),
            "Resolved transfer source"
        );
        Ok((matches, spec.base_dir))
    }

    /// Whether an object exists at `path`
    pub async fn exists(&self, path: &str) -> StorageResult<bool> {
        self.driver.exists(path).await
    }

    /// File at `path`, `None` when absent
    pub async fn get_file(&self, path: &str) -> StorageResult<Option<BucketFile>> {
        let object = self.driver.fetch_metadata(path).await?;
        Ok(object.map(|object| self.wrap(&object)))
    }

    /// One page of files, filtered client-side when the prefix is a glob
    pub async fn list(&self, arg: impl Into<ListArg>) -> StorageResult<ListResult> {
        let (query, matcher) = resolve_list_arg(arg.into())?;
        let page = self.driver.list_raw(&query).await?;

        let files = page
            .items
            .iter()
            .filter(|object| {
                matcher
                    .as_ref()
                    .is_none_or(|m| m.is_match(self.driver.remote_path(object)))
            })
            .map(|object| self.wrap(object))
            .collect();

        Ok(ListResult {
            files,
            dirs: page.dirs,
            next_marker: page.next_marker,
        })
    }

    /// Files of one listing page
    pub async fn list_files(&self, arg: impl Into<ListArg>) -> StorageResult<Vec<BucketFile>> {
        Ok(self.list(arg).await?.files)
    }

    /// Server-side copy of every object matching `prefix_or_glob`
    pub async fn copy<'a>(
        &self,
        prefix_or_glob: &str,
        dest: impl Into<CopyDest<'a>>,
    ) -> StorageResult<()> {
        self.copy_with_cancel(prefix_or_glob, dest, &CancellationToken::new())
            .await
    }

    /// [`copy`](Self::copy) that stops with [`StorageError::Cancelled`] once `cancel` fires
    pub async fn copy_with_cancel<'a>(
        &self,
        prefix_or_glob: &str,
        dest: impl Into<CopyDest<'a>>,
        cancel: &CancellationToken,
    ) -> StorageResult<()> {
        let (dest_bucket, dest_path) = match dest.into() {
            CopyDest::Path(path) => (self.handle.clone(), path.to_string()),
            CopyDest::File(file) => (file.bucket.clone(), file.path.clone()),
            CopyDest::Bucket(bucket, path) => (bucket.clone(), path.to_string()),
        };

        if dest_bucket.backend() != self.backend() {
            return Err(StorageError::CrossBackendMismatch {
                source_backend: self.backend(),
                destination_backend: dest_bucket.backend(),
            });
        }
        if dest_path.is_empty() {
            return Err(StorageError::invalid_argument("no copy destination given"));
        }

        let (matches, base_dir) = self.resolve_matches(prefix_or_glob, cancel).await?;
        let into_dir = dest_path.ends_with('/');
        if !into_dir && matches.len() > 1 {
            return Err(StorageError::TooManyMatches {
                source_spec: prefix_or_glob.to_string(),
                destination: dest_path,
                matched: matches.len(),
            });
        }

        for object in &matches {
            let remote = self.driver.remote_path(object);
            let target = if into_dir {
                resolve_destination_path(base_dir.as_deref(), remote, &dest_path)
            } else {
                dest_path.clone()
            };
            let event = OpEvent::transfer(
                Operation::Copy,
                self.handle.uri(remote),
                dest_bucket.uri(&target),
            );
            self.observe(
                event,
                cancellable(
                    cancel,
                    self.driver.copy_within_backend(object, &dest_bucket, &target),
                ),
            )
            .await?;
        }
        Ok(())
    }

    /// Download every object matching `prefix_or_glob` to `local_dest`
    ///
    /// Parent directories are created as needed. Folder marker objects, whose
    /// key ends in `/`, are skipped when downloading into a directory. The
    /// returned files carry their `local_path`.
    pub async fn download(
        &self,
        prefix_or_glob: &str,
        local_dest: &str,
    ) -> StorageResult<Vec<BucketFile>> {
        self.download_with_cancel(prefix_or_glob, local_dest, &CancellationToken::new())
            .await
    }

    /// [`download`](Self::download) that stops with [`StorageError::Cancelled`] once `cancel` fires
    pub async fn download_with_cancel(
        &self,
        prefix_or_glob: &str,
        local_dest: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<Vec<BucketFile>> {
        if local_dest.is_empty() {
            return Err(StorageError::invalid_argument("no download destination given"));
        }

        let (matches, base_dir) = self.resolve_matches(prefix_or_glob, cancel).await?;
        let into_dir = is_local_dir(local_dest);
        if !into_dir && matches.len() > 1 {
            return Err(StorageError::TooManyMatches {
                source_spec: prefix_or_glob.to_string(),
                destination: local_dest.to_string(),
                matched: matches.len(),
            });
        }

        let mut downloaded = Vec::with_capacity(matches.len());
        for object in &matches {
            let remote = self.driver.remote_path(object);
            if into_dir && remote.ends_with('/') {
                debug!(bucket = %self.handle, path = %remote, "Skipping folder marker");
                continue;
            }
            let local_path = if into_dir {
                PathBuf::from(resolve_destination_path(base_dir.as_deref(), remote, local_dest))
            } else {
                PathBuf::from(local_dest)
            };
            ensure_parent_dir(&local_path).await?;

            let event = OpEvent::transfer(
                Operation::Download,
                self.handle.uri(remote),
                local_path.display().to_string(),
            );
            self.observe(
                event,
                cancellable(cancel, self.driver.download_to_local_file(object, &local_path)),
            )
            .await?;

            let mut file = self.wrap(object);
            file.local_path = Some(local_path);
            downloaded.push(file);
        }
        Ok(downloaded)
    }

    /// Full content of a text object
    pub async fn download_as_text(&self, path: &str) -> StorageResult<String> {
        self.driver.fetch_content_as_text(path).await
    }

    /// Upload a local file, directory or glob to `remote`
    ///
    /// Directory and glob sources keep their layout relative to the source's
    /// base directory below `remote`, which must then end with `/` unless the
    /// source resolves to a single file. A literal file uploaded to a
    /// directory keeps its file name.
    pub async fn upload(&self, local: &str, remote: &str) -> StorageResult<Vec<BucketFile>> {
        self.upload_with_cancel(local, remote, &CancellationToken::new())
            .await
    }

    /// [`upload`](Self::upload) that stops with [`StorageError::Cancelled`] once `cancel` fires
    pub async fn upload_with_cancel(
        &self,
        local: &str,
        remote: &str,
        cancel: &CancellationToken,
    ) -> StorageResult<Vec<BucketFile>> {
        let source = expand_local_source(local).await?;
        let into_dir = remote.is_empty() || remote.ends_with('/');
        if source.expanded && !into_dir && source.files.len() > 1 {
            return Err(StorageError::TooManyMatches {
                source_spec: local.to_string(),
                destination: remote.to_string(),
                matched: source.files.len(),
            });
        }

        let mut uploaded = Vec::with_capacity(source.files.len());
        for file in &source.files {
            let local_text = normalize_local(file, false);
            let target = if !source.expanded {
                build_full_dest_path(&local_text, remote)?
            } else if into_dir {
                resolve_destination_path(source.base_dir.as_deref(), &local_text, remote)
            } else {
                remote.to_string()
            };
            let content_type = content_type_for(&target);

            let event = OpEvent::transfer(
                Operation::Upload,
                file.display().to_string(),
                self.handle.uri(&target),
            );
            let object = self
                .observe(
                    event,
                    cancellable(
                        cancel,
                        self.driver
                            .upload_local_file(file, &target, content_type.as_deref()),
                    ),
                )
                .await?;
            uploaded.push(self.wrap(&object));
        }
        Ok(uploaded)
    }

    /// Store `content` at `path`; the content type follows the path's extension
    pub async fn upload_content(&self, path: &str, content: impl Into<Bytes>) -> StorageResult<()> {
        let content = content.into();
        let content_type = content_type_for(path);
        let event = OpEvent::transfer(
            Operation::Upload,
            format!("<{} bytes>", content.len()),
            self.handle.uri(path),
        );
        self.observe(
            event,
            self.driver
                .upload_content(path, content, content_type.as_deref()),
        )
        .await
    }

    /// Stream an object's content
    pub async fn create_read_stream(&self, path: &str) -> StorageResult<ObjectReader> {
        self.driver.open_read_stream(path).await
    }

    /// Open a two-phase write stream; see [`ObjectWriter::finish`]
    pub async fn create_write_stream(&self, path: &str) -> StorageResult<ObjectWriter> {
        let content_type = content_type_for(path);
        self.driver
            .open_write_stream(path, content_type.as_deref())
            .await
    }

    /// Delete one object; `false` when it was already absent
    pub async fn delete(&self, path: &str) -> StorageResult<bool> {
        if path.is_empty() {
            return Err(StorageError::invalid_argument("no path given to delete"));
        }

        let event = OpEvent::delete(self.handle.uri(path));
        self.observer.on_start(&event);
        match self.driver.delete_object(path).await {
            Ok(true) => {
                self.observer.on_success(&event);
                Ok(true)
            }
            Ok(false) => {
                self.observer.on_skip(&event);
                Ok(false)
            }
            Err(e) => {
                self.observer.on_failure(&event, &e);
                Err(e)
            }
        }
    }

    /// Delete a set of files produced by this bucket
    ///
    /// Every file is checked for ownership before anything is deleted.
    /// Already absent objects report `deleted == false`.
    pub async fn delete_all(&self, files: &[BucketFile]) -> StorageResult<Vec<BucketFileDeleted>> {
        self.delete_all_with_cancel(files, &CancellationToken::new())
            .await
    }

    /// [`delete_all`](Self::delete_all) that stops with [`StorageError::Cancelled`] once `cancel` fires
    pub async fn delete_all_with_cancel(
        &self,
        files: &[BucketFile],
        cancel: &CancellationToken,
    ) -> StorageResult<Vec<BucketFileDeleted>> {
        if let Some(foreign) = files.iter().find(|file| file.bucket != self.handle) {
            return Err(StorageError::CrossBucketMismatch {
                path: foreign.path.clone(),
                owner: foreign.bucket.to_string(),
                bucket: self.handle.to_string(),
            });
        }

        let mut results = Vec::with_capacity(files.len());
        for file in files {
            let deleted = cancellable(cancel, self.delete(&file.path)).await?;
            results.push(BucketFileDeleted {
                file: file.clone(),
                deleted,
            });
        }
        Ok(results)
    }
}
