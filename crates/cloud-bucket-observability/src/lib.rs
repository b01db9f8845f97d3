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

//! Structured logging for Cloud Bucket
//!
//! Library crates log through `tracing` macros with structured fields;
//! this crate installs the subscriber that renders them.
//!
//! - **Formats**: pretty, compact and JSON
//! - **Filtering**: directives from config, `CLOUD_BUCKET_LOG` or `RUST_LOG`
//!
//! # Example
//!
//! ```no_run
//! use cloud_bucket_observability::{init_tracing_with_config, LogConfig, LogFormat};
//!
//! let config = LogConfig::new().with_format(LogFormat::Json).with_level("info");
//! init_tracing_with_config(&config).unwrap();
//! tracing::info!(bucket = "media", "Connected");
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput, LOG_ENV_VAR};
pub use initialization::{init_tracing, init_tracing_with_config, parse_filter};
