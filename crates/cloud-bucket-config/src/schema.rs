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

//! Configuration schema
//!
//! ```toml
//! [buckets.media]
//! bucket_name = "media"
//! access_key_id = "AKIA..."
//! access_key_secret = "..."
//!
//! [signing.videos]
//! type = "s3"
//! key_name = "K2JCJMDEHXQW5F"
//! key_path = "/etc/cloud-bucket/cloudfront.pem"
//! urls = ["https://d111111abcdef8.cloudfront.net/videos/*"]
//!
//! [logging]
//! level = "info"
//! format = "json"
//! log_transfers = true
//! ```

use crate::error::{ConfigError, ConfigResult};
use cloud_bucket_observability::{LogConfig, LogFormat};
use cloud_bucket_signer::{SignUrlOptions, SigningScheme, UrlSigner, WILDCARD};
use cloud_bucket_storage::{get_bucket, AnyBucket, BucketOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Named bucket configurations, passed as-is to the driver factory
    #[serde(default)]
    pub buckets: BTreeMap<String, Value>,

    /// Named URL signing profiles
    #[serde(default)]
    pub signing: BTreeMap<String, SigningProfile>,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Raw configuration of the bucket called `name`
    pub fn bucket_config(&self, name: &str) -> ConfigResult<&Value> {
        self.buckets.get(name).ok_or_else(|| ConfigError::UnknownEntry {
            kind: "bucket",
            name: name.to_string(),
        })
    }

    /// Façade options derived from the logging settings
    pub fn bucket_options(&self) -> BucketOptions {
        BucketOptions {
            log: self.logging.log_transfers,
        }
    }

    /// Connect the bucket called `name`
    pub async fn connect_bucket(&self, name: &str) -> ConfigResult<AnyBucket> {
        let bucket = get_bucket(self.bucket_config(name)?, self.bucket_options()).await?;
        Ok(bucket)
    }

    /// Signing profile called `name`
    pub fn signing_profile(&self, name: &str) -> ConfigResult<&SigningProfile> {
        self.signing.get(name).ok_or_else(|| ConfigError::UnknownEntry {
            kind: "signing profile",
            name: name.to_string(),
        })
    }

    /// Profile whose URL base is the longest prefix of `url`
    pub fn profile_for_url(&self, url: &str) -> Option<(&str, &SigningProfile)> {
        self.signing
            .iter()
            .filter_map(|(name, profile)| {
                profile
                    .matching_base(url)
                    .map(|base| (base.len(), name.as_str(), profile))
            })
            .max_by_key(|(len, _, _)| *len)
            .map(|(_, name, profile)| (name, profile))
    }

    /// Sign `url` with the profile covering it
    pub async fn sign_url(&self, url: &str) -> ConfigResult<String> {
        let (name, profile) = self.profile_for_url(url).ok_or_else(|| ConfigError::UnknownEntry {
            kind: "signing profile for URL",
            name: url.to_string(),
        })?;
        debug!(profile = %name, url = %url, "Signing URL");
        let opts = profile.options().await?;
        Ok(cloud_bucket_signer::sign_url(url, &opts)?)
    }
}

fn default_expires_in_secs() -> u64 {
    3600
}

/// How URLs below a set of bases get signed
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct SigningProfile {
    /// Backend tag: `s3`, `gs`, `minio` or `none`
    #[serde(rename = "type")]
    pub scheme: String,

    /// Key pair ID (`s3`) or key name (`gs`)
    #[serde(default)]
    pub key_name: String,

    /// Inline key material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// File holding the key material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_path: Option<PathBuf>,

    /// Lifetime of signed URLs in seconds
    #[serde(default = "default_expires_in_secs")]
    pub expires_in_secs: u64,

    /// URL bases this profile signs; a trailing `*` marks a wildcard base
    #[serde(default)]
    pub urls: Vec<String>,
}

impl SigningProfile {
    /// Parsed signing scheme
    pub fn signing_scheme(&self) -> ConfigResult<SigningScheme> {
        Ok(self.scheme.parse()?)
    }

    /// First configured base covering `url`
    pub fn matching_base(&self, url: &str) -> Option<&str> {
        self.urls
            .iter()
            .map(|base| base.strip_suffix(WILDCARD).unwrap_or(base))
            .find(|base| url.starts_with(base))
    }

    /// Key material, read from `key_path` when not given inline
    pub async fn load_key(&self) -> ConfigResult<String> {
        match (&self.key, &self.key_path) {
            (Some(key), _) => Ok(key.clone()),
            (None, Some(path)) => Ok(tokio::fs::read_to_string(path).await?),
            (None, None) => Ok(String::new()),
        }
    }

    /// Signing options expiring `expires_in_secs` from now
    pub async fn options(&self) -> ConfigResult<SignUrlOptions> {
        Ok(
            SignUrlOptions::new(self.signing_scheme()?, &self.key_name, self.load_key().await?)
                .expires_in(Duration::from_secs(self.expires_in_secs)),
        )
    }

    /// Reusable signers, one per configured base
    pub async fn signers(&self) -> ConfigResult<Vec<UrlSigner>> {
        let opts = self.options().await?;
        self.urls
            .iter()
            .map(|base| UrlSigner::new(base, &opts).map_err(ConfigError::from))
            .collect()
    }
}

impl fmt::Debug for SigningProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningProfile")
            .field("scheme", &self.scheme)
            .field("key_name", &self.key_name)
            .field("key", &self.key.as_ref().map(|_| "***"))
            .field("key_path", &self.key_path)
            .field("expires_in_secs", &self.expires_in_secs)
            .field("urls", &self.urls)
            .finish()
    }
}

fn default_log_format() -> String {
    LogFormat::default().as_str().to_string()
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Filter directives; unset defers to `CLOUD_BUCKET_LOG` and `RUST_LOG`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// `pretty`, `compact` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log one line per transfer
    #[serde(default)]
    pub log_transfers: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: None,
            format: default_log_format(),
            log_transfers: false,
        }
    }
}

impl LoggingConfig {
    /// Subscriber configuration for these settings
    pub fn log_config(&self) -> ConfigResult<LogConfig> {
        let format: LogFormat = self
            .format
            .parse()
            .map_err(|e: cloud_bucket_observability::LogError| ConfigError::invalid_value("logging.format", e.to_string()))?;
        let mut config = LogConfig::new().with_format(format);
        if let Some(level) = &self.level {
            config = config.with_level(level.as_str());
        }
        Ok(config)
    }
}
