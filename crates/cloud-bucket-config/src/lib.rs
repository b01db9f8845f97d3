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

//! Configuration files for Cloud Bucket
//!
//! A file names buckets, URL signing profiles and logging settings, in
//! TOML, YAML or JSON:
//!
//! ```yaml
//! buckets:
//!   media:
//!     bucket_name: media
//!     access_key_id: AKIA...
//!     access_key_secret: "..."
//!   assets:
//!     project_id: my-project
//!     bucket_name: assets
//!     keyFilename: /etc/cloud-bucket/gcs.json
//! signing:
//!   cdn:
//!     type: gs
//!     key_name: my-key
//!     key_path: /etc/cloud-bucket/cdn.key
//!     urls: ["https://cdn.example.com/assets/*"]
//! logging:
//!   format: json
//!   log_transfers: true
//! ```
//!
//! ```no_run
//! use cloud_bucket_config::ConfigLoader;
//!
//! # async fn run() -> cloud_bucket_config::ConfigResult<()> {
//! let config = ConfigLoader::new().load_with_overrides("cloud-bucket.yaml").await?;
//! let bucket = config.connect_bucket("media").await?;
//! let url = config.sign_url("https://cdn.example.com/assets/logo.png").await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, ConfigLoader};
pub use schema::{Config, LoggingConfig, SigningProfile};
pub use validation::Validator;
