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
use crate::error::{ConfigError, ConfigResult};
use crate::schema::{Config, LoggingConfig, SigningProfile};
use cloud_bucket_observability::parse_filter;
use cloud_bucket_signer::{HmacKey, PolicyKey, SigningScheme};
use cloud_bucket_storage::BackendConfig;
use serde_json::Value;

/// Trait for validating configuration
pub trait Validator {
    /// Validate the configuration
    fn validate(&self) -> ConfigResult<()>;
}

impl Validator for Config {
    fn validate(&self) -> ConfigResult<()> {
        for (name, value) in &self.buckets {
            validate_bucket(name, value)?;
        }
        for (name, profile) in &self.signing {
            profile
                .validate()
                .map_err(|e| ConfigError::invalid_value(format!("signing.{name}"), e.to_string()))?;
        }
        self.logging.validate()
    }
}

fn validate_bucket(name: &str, value: &Value) -> ConfigResult<()> {
    let field = format!("buckets.{name}");
    let backend =
        BackendConfig::from_value(value).map_err(|e| ConfigError::invalid_value(&field, e.to_string()))?;

    if backend.bucket_name().is_empty() {
        return Err(ConfigError::MissingRequired(format!("{field}.bucket_name")));
    }
    if let BackendConfig::Minio(minio) = &backend {
        minio
            .validate()
            .map_err(|e| ConfigError::invalid_value(&field, e.to_string()))?;
    }
    Ok(())
}

impl Validator for SigningProfile {
    fn validate(&self) -> ConfigResult<()> {
        let scheme = self.signing_scheme()?;

        if self.expires_in_secs == 0 {
            return Err(ConfigError::invalid_value(
                "expires_in_secs",
                "must be greater than zero",
            ));
        }
        if self.urls.iter().any(|url| url.is_empty()) {
            return Err(ConfigError::invalid_value("urls", "URL bases cannot be empty"));
        }
        if scheme == SigningScheme::Passthrough {
            return Ok(());
        }

        if self.key_name.is_empty() {
            return Err(ConfigError::MissingRequired("key_name".to_string()));
        }
        match (&self.key, &self.key_path) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingValues(
                "set either `key` or `key_path`, not both".to_string(),
            )),
            (None, None) => Err(ConfigError::MissingRequired("key or key_path".to_string())),
            (None, Some(_)) => Ok(()),
            (Some(key), None) => {
                match scheme {
                    SigningScheme::Policy => {
                        PolicyKey::from_pem(key)?;
                    }
                    SigningScheme::Hmac => {
                        HmacKey::from_base64(key)?;
                    }
                    SigningScheme::Passthrough => {}
                }
                Ok(())
            }
        }
    }
}

impl Validator for LoggingConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.log_config()?;
        if let Some(level) = &self.level {
            parse_filter(level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }
        Ok(())
    }
}
