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

//! Storage error types and utilities

use crate::types::BackendType;
use std::io;
use thiserror::Error;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed driver-reported cause
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// Object not found in storage
    #[error("object not found: {0}")]
    NotFound(String),

    /// A single-target destination was given but the source matched several objects
    #[error("{matched} objects match '{source_spec}' but destination '{destination}' is not a directory (must end with '/')")]
    TooManyMatches {
        /// Source prefix or glob as given by the caller
        source_spec: String,
        /// Destination as given by the caller
        destination: String,
        /// Number of matched objects
        matched: usize,
    },

    /// Copy destination lives on another backend type
    #[error("cannot copy from {source_backend} to {destination_backend}: backends differ")]
    CrossBackendMismatch {
        /// Backend of the source bucket
        source_backend: BackendType,
        /// Backend of the destination bucket
        destination_backend: BackendType,
    },

    /// A file handed to a bucket operation belongs to another bucket
    #[error("file '{path}' belongs to {owner}, not to {bucket}")]
    CrossBucketMismatch {
        /// Remote path of the offending file
        path: String,
        /// URI of the bucket that produced the file
        owner: String,
        /// URI of the bucket the operation was invoked on
        bucket: String,
    },

    /// The driver cannot perform the requested cross-backend operation
    #[error("{0} driver does not support this cross-backend operation")]
    UnsupportedCrossBackend(BackendType),

    /// Caller supplied an unusable argument (empty path, malformed glob, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Driver configuration could not be recognized or is incomplete
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Backend call failed; the driver's cause is attached as the source
    #[error("{message}")]
    Backend {
        /// What the driver was doing
        message: String,
        /// Driver-reported cause
        #[source]
        source: BoxError,
    },

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operation was cancelled through its cancellation token
    #[error("operation cancelled")]
    Cancelled,

    /// Transparent error delegation for wrapped error types
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StorageError {
    /// Create a NotFound error with the given path
    pub fn not_found<S: Into<String>>(path: S) -> Self {
        StorageError::NotFound(path.into())
    }

    /// Create an InvalidArgument error with context
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        StorageError::InvalidArgument(msg.into())
    }

    /// Create an InvalidConfig error with context
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        StorageError::InvalidConfig(msg.into())
    }

    /// Create a Backend error wrapping the driver-reported cause
    pub fn backend<S, E>(msg: S, source: E) -> Self
    where
        S: Into<String>,
        E: Into<BoxError>,
    {
        StorageError::Backend {
            message: msg.into(),
            source: source.into(),
        }
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }

    /// Check if this is a TooManyMatches error
    pub fn is_too_many_matches(&self) -> bool {
        matches!(self, StorageError::TooManyMatches { .. })
    }

    /// Check if this is a Cancelled error
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StorageError::Cancelled)
    }
}
