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

//! Uniform bucket access over several object stores
//!
//! One façade, [`Bucket`], exposes the same high-level operations for every
//! backend:
//! - AWS S3
//! - MinIO / S3-compatible
//! - Google Cloud Storage (feature `gcs`, on by default)
//! - In-memory (tests and local experiments)
//!
//! # Architecture
//!
//! Each backend implements the [`Driver`] trait: a small set of primitive
//! calls over its native object record. The façade resolves path
//! expressions, enforces the single-target rule, walks listings and reports
//! transfers to a [`BucketObserver`], so drivers stay thin.
//!
//! ## Core Concepts
//!
//! - **Path expressions**: a literal prefix (`photos/2024/`) or a glob
//!   (`photos/**/*.jpg`). Backends only filter by the literal part, the glob
//!   is matched client-side.
//! - **Directory destinations**: a destination ending in `/` receives every
//!   matched item at its path relative to the source's base directory.
//! - **Files**: every [`BucketFile`] carries the [`BucketRef`] of the bucket
//!   that produced it.
//!
//! # Examples
//!
//! ```no_run
//! use cloud_bucket_storage::{get_bucket, BucketOptions};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> cloud_bucket_storage::StorageResult<()> {
//!     let bucket = get_bucket(
//!         &json!({
//!             "bucketName": "media",
//!             "access_key_id": "minioadmin",
//!             "access_key_secret": "minioadmin",
//!             "minio_endpoint": "http://localhost:9000"
//!         }),
//!         BucketOptions { log: true },
//!     )
//!     .await?;
//!
//!     bucket.upload("./assets/", "assets/").await?;
//!     for file in bucket.list_files("assets/**/*.png").await? {
//!         println!("{} ({:?} bytes)", file.uri(), file.size);
//!     }
//!     Ok(())
//! }
//! ```

pub mod bucket;
pub mod driver;
pub mod error;
pub mod factory;
#[cfg(feature = "gcs")]
pub mod gcs;
pub mod local;
pub mod memory;
pub mod minio;
pub mod observer;
pub mod pathspec;
pub mod s3;
pub mod stream;
pub mod types;

pub use bucket::{Bucket, BucketOptions, CopyDest};
pub use driver::Driver;
pub use error::{StorageError, StorageResult};
pub use factory::{get_bucket, AnyBucket, BackendConfig};
#[cfg(feature = "gcs")]
pub use gcs::{GcsConfig, GcsDriver};
pub use memory::MemoryDriver;
pub use minio::MinioConfig;
pub use observer::{BucketObserver, NoopObserver, OpEvent, Operation, TracingObserver};
pub use pathspec::{parse_prefix_or_glob, PathSpec};
pub use s3::{S3Config, S3Driver};
pub use stream::{ObjectReader, ObjectWriter};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    BackendType, BucketFile, BucketFileDeleted, BucketRef, FileInfo, ListArg, ListOptions,
    ListResult,
};
