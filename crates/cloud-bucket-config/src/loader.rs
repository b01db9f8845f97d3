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
use crate::schema::Config;
use crate::validation::Validator;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Configuration format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect format from file extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::InvalidPath(path.to_path_buf())),
        }
    }

    /// Get format name as string
    pub fn name(&self) -> &'static str {
        match self {
            ConfigFormat::Toml => "TOML",
            ConfigFormat::Yaml => "YAML",
            ConfigFormat::Json => "JSON",
        }
    }
}

/// Configuration loader
#[derive(Debug)]
pub struct ConfigLoader {
    validate: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        ConfigLoader { validate: true }
    }

    /// Create a loader without validation
    pub fn without_validation() -> Self {
        ConfigLoader { validate: false }
    }

    /// Load configuration from a file
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let path = path.as_ref();
        debug!("Loading configuration from: {}", path.display());

        let format = ConfigFormat::from_path(path)?;
        if !fs::try_exists(path).await? {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path).await?;

        info!(
            "Loaded {} configuration file: {}",
            format.name(),
            path.display()
        );

        self.load_from_string(&content, format)
    }

    /// Load configuration from a string
    pub fn load_from_string(&self, content: &str, format: ConfigFormat) -> ConfigResult<Config> {
        let config: Config = match format {
            ConfigFormat::Toml => toml::from_str(content)?,
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };

        debug!(
            buckets = config.buckets.len(),
            signing_profiles = config.signing.len(),
            "Configuration loaded from {}",
            format.name()
        );

        if self.validate {
            config.validate()?;
            info!("Configuration validated successfully");
        }

        Ok(config)
    }

    /// Load configuration with environment variable overrides
    pub async fn load_with_overrides<P: AsRef<Path>>(&self, path: P) -> ConfigResult<Config> {
        let mut config = self.load_file(path).await?;
        self.apply_env_overrides(&mut config)?;
        if self.validate {
            config.logging.validate()?;
        }
        Ok(config)
    }

    /// Merge several files; later files take precedence
    pub async fn load_and_merge<P: AsRef<Path>>(&self, paths: &[P]) -> ConfigResult<Config> {
        let Some((first, rest)) = paths.split_first() else {
            return Err(ConfigError::MissingRequired(
                "at least one configuration file".to_string(),
            ));
        };

        let mut merged = self.load_file(first).await?;
        for path in rest {
            let overlay = self.load_file(path).await?;
            merge_configs(&mut merged, overlay);
        }

        Ok(merged)
    }

    /// Apply `CLOUD_BUCKET_LOG_LEVEL`, `CLOUD_BUCKET_LOG_FORMAT` and
    /// `CLOUD_BUCKET_LOG_TRANSFERS`
    pub fn apply_env_overrides(&self, config: &mut Config) -> ConfigResult<()> {
        if let Ok(value) = std::env::var("CLOUD_BUCKET_LOG_LEVEL") {
            config.logging.level = Some(value);
        }
        if let Ok(value) = std::env::var("CLOUD_BUCKET_LOG_FORMAT") {
            config.logging.format = value;
        }
        if let Ok(value) = std::env::var("CLOUD_BUCKET_LOG_TRANSFERS") {
            config.logging.log_transfers = parse_bool("CLOUD_BUCKET_LOG_TRANSFERS", &value)?;
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Same-named buckets and signing profiles are replaced, logging settings
/// are replaced when the overlay sets any
fn merge_configs(base: &mut Config, overlay: Config) {
    base.buckets.extend(overlay.buckets);
    base.signing.extend(overlay.signing);
    if overlay.logging != Default::default() {
        base.logging = overlay.logging;
    }
}

/// Parse boolean from string (accepts: true, false, yes, no, 1, 0, on, off)
fn parse_bool(variable_name: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::env_var_parsing_error(
            variable_name,
            value,
            "expected 'true', 'false', 'yes', 'no', '1', '0', 'on', or 'off'",
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(ConfigFormat::from_path("config.toml").unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path("config.yaml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("config.yml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path("config.json").unwrap(), ConfigFormat::Json);
    }

    #[test]
    fn test_format_detection_error() {
        assert!(matches!(
            ConfigFormat::from_path("config.xml"),
            Err(ConfigError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            ConfigFormat::from_path("config"),
            Err(ConfigError::InvalidPath(_))
        ));
    }

    #[test]
    fn test_parse_bool() {
        for value in ["true", "YES", "1", "on"] {
            assert!(parse_bool("V", value).unwrap());
        }
        for value in ["false", "no", "0", "Off"] {
            assert!(!parse_bool("V", value).unwrap());
        }
        assert!(matches!(
            parse_bool("V", "maybe"),
            Err(ConfigError::EnvVarParsingError { .. })
        ));
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = ConfigLoader::new().load_from_string("", ConfigFormat::Toml).unwrap();
        assert!(config.buckets.is_empty());
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_without_validation_skips_rules() {
        let json = r#"{"logging": {"format": "xml"}}"#;
        assert!(ConfigLoader::new().load_from_string(json, ConfigFormat::Json).is_err());
        assert!(ConfigLoader::without_validation()
            .load_from_string(json, ConfigFormat::Json)
            .is_ok());
    }

    #[test]
    fn test_merge_replaces_entries() {
        let loader = ConfigLoader::without_validation();
        let mut base = loader
            .load_from_string(
                r#"{"buckets": {"a": {"x": 1}, "b": {"x": 1}}, "logging": {"level": "info"}}"#,
                ConfigFormat::Json,
            )
            .unwrap();
        let overlay = loader
            .load_from_string(r#"{"buckets": {"b": {"x": 2}}}"#, ConfigFormat::Json)
            .unwrap();

        merge_configs(&mut base, overlay);
        assert_eq!(base.buckets["a"]["x"], 1);
        assert_eq!(base.buckets["b"]["x"], 2);
        assert_eq!(base.logging.level.as_deref(), Some("info"));
    }
}
