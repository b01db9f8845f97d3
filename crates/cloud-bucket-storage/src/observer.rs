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

//! Transfer observers
//!
//! The façade reports every remote transfer and delete to a
//! [`BucketObserver`]. The default [`NoopObserver`] discards events;
//! [`TracingObserver`] turns them into human-readable `tracing` lines.

use crate::error::StorageError;
use std::fmt;
use tracing::{info, warn};

/// Kind of remote operation being reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Server-side copy
    Copy,
    /// Remote to local transfer
    Download,
    /// Local to remote transfer
    Upload,
    /// Object removal
    Delete,
}

impl Operation {
    fn verb(&self) -> &'static str {
        match self {
            Operation::Copy => "Copying",
            Operation::Download => "Downloading",
            Operation::Upload => "Uploading",
            Operation::Delete => "Deleting",
        }
    }
}

/// One observed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpEvent {
    /// What is being done
    pub operation: Operation,
    /// Source, as `scheme://bucket/path` or a local path
    pub source: String,
    /// Destination, absent for deletes
    pub target: Option<String>,
}

impl OpEvent {
    /// Event for a transfer from `source` to `target`
    pub fn transfer(operation: Operation, source: String, target: String) -> Self {
        OpEvent {
            operation,
            source,
            target: Some(target),
        }
    }

    /// Event for a delete of `source`
    pub fn delete(source: String) -> Self {
        OpEvent {
            operation: Operation::Delete,
            source,
            target: None,
        }
    }
}

impl fmt::Display for OpEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(target) => write!(f, "{} {} to {}", self.operation.verb(), self.source, target),
            None => write!(f, "{} {}", self.operation.verb(), self.source),
        }
    }
}

/// Receiver of transfer lifecycle events
pub trait BucketObserver: Send + Sync + fmt::Debug {
    /// Operation is about to start
    fn on_start(&self, _event: &OpEvent) {}

    /// Operation completed
    fn on_success(&self, _event: &OpEvent) {}

    /// Operation had nothing to do (delete of an absent object)
    fn on_skip(&self, _event: &OpEvent) {}

    /// Operation failed; the error is returned to the caller afterwards
    fn on_failure(&self, _event: &OpEvent, _error: &StorageError) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl BucketObserver for NoopObserver {}

/// Observer logging one line per finished operation through `tracing`
///
/// Lines read `Copying s3://media/a.txt to s3://media/b.txt - DONE`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl BucketObserver for TracingObserver {
    fn on_success(&self, event: &OpEvent) {
        info!(target: "cloud_bucket", "{event} - DONE");
    }

    fn on_skip(&self, event: &OpEvent) {
        info!(target: "cloud_bucket", "{event} - SKIPPED (object not found)");
    }

    fn on_failure(&self, event: &OpEvent, error: &StorageError) {
        warn!(target: "cloud_bucket", "{event} - FAIL - ABORT - Cause: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let copy = OpEvent::transfer(
            Operation::Copy,
            "s3://media/a.txt".to_string(),
            "s3://media/b.txt".to_string(),
        );
        assert_eq!(copy.to_string(), "Copying s3://media/a.txt to s3://media/b.txt");

        let delete = OpEvent::delete("gs://media/a.txt".to_string());
        assert_eq!(delete.to_string(), "Deleting gs://media/a.txt");
    }

    #[test]
    fn test_tracing_observer_does_not_panic_without_subscriber() {
        let event = OpEvent::delete("mem://b/x".to_string());
        TracingObserver.on_start(&event);
        TracingObserver.on_success(&event);
        TracingObserver.on_skip(&event);
        TracingObserver.on_failure(&event, &StorageError::Cancelled);
    }
}
