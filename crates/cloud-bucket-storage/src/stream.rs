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

//! Object read and write streams
//!
//! Writing to a remote object completes in two phases. Bytes written to an
//! [`ObjectWriter`] go through an in-process pipe to an upload task owned by
//! the driver. [`ObjectWriter::finish`] first closes the local side (all
//! bytes handed to the pipe), then waits until the upload task reports that
//! the backend has durably stored the object. Only then is the write done.
//!
//! ```no_run
//! use cloud_bucket_storage::{Bucket, MemoryDriver};
//! use tokio::io::AsyncWriteExt;
//!
//! # async fn run() -> cloud_bucket_storage::StorageResult<()> {
//! let bucket = Bucket::new(MemoryDriver::new("logs"));
//! let mut writer = bucket.create_write_stream("2024/app.log").await?;
//! writer.write_all(b"started\n").await?;
//! writer.finish().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{StorageError, StorageResult};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

/// Readable stream over a remote object's content
pub type ObjectReader = Pin<Box<dyn AsyncRead + Send>>;

/// Pipe capacity between the writer and its upload task
pub const WRITE_PIPE_CAPACITY: usize = 256 * 1024;

/// Writable stream into a remote object
///
/// Dropping the writer without calling [`finish`](Self::finish) aborts the
/// upload task; no partial object is committed.
#[derive(Debug)]
pub struct ObjectWriter {
    sink: DuplexStream,
    upload: Option<JoinHandle<StorageResult<()>>>,
}

impl ObjectWriter {
    /// Spawn `upload` on the reading end of a fresh pipe and return the writing end
    pub fn spawn<F, Fut>(upload: F) -> Self
    where
        F: FnOnce(DuplexStream) -> Fut,
        Fut: Future<Output = StorageResult<()>> + Send + 'static,
    {
        let (sink, source) = tokio::io::duplex(WRITE_PIPE_CAPACITY);
        let handle = tokio::spawn(upload(source));
        ObjectWriter {
            sink,
            upload: Some(handle),
        }
    }

    /// Close the local side and wait for the backend to acknowledge the object
    pub async fn finish(mut self) -> StorageResult<()> {
        // Phase 1: every written byte is in the pipe and the reader sees EOF.
        let flushed = self.sink.shutdown().await;

        let handle = match self.upload.take() {
            Some(handle) => handle,
            None => return Err(StorageError::invalid_argument("write stream already finished")),
        };

        // Phase 2: the backend committed the object.
        let committed = match handle.await {
            Ok(result) => result,
            Err(e) => Err(StorageError::backend("upload task did not complete", e)),
        };

        // An upload failure usually explains a broken pipe, so report it first.
        committed?;
        flushed?;
        Ok(())
    }
}

impl Drop for ObjectWriter {
    fn drop(&mut self) {
        if let Some(handle) = self.upload.take() {
            handle.abort();
        }
    }
}

impl AsyncWrite for ObjectWriter {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.sink).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.sink).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.sink).poll_shutdown(cx)
    }
}
