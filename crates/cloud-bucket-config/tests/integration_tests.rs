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
#![allow(clippy::unwrap_used)]
//! Loading, validating and using configuration files

use cloud_bucket_config::{Config, ConfigError, ConfigFormat, ConfigLoader, Validator};
use std::fs;
use tempfile::TempDir;

const HMAC_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZg==";

const TOML_CONFIG: &str = r#"
[buckets.media]
bucket_name = "media"
access_key_id = "AKIAEXAMPLE"
access_key_secret = "secret"
region = "eu-west-1"

[buckets.local]
minio_endpoint = "http://localhost:9000"
bucket_name = "cloud-bucket-test"
access_key_id = "minioadmin"
access_key_secret = "minioadmin"

[signing.cdn]
type = "gs"
key_name = "my-key"
key = "MDEyMzQ1Njc4OWFiY2RlZg=="
expires_in_secs = 600
urls = ["https://cdn.example.com/videos/*"]

[logging]
level = "info"
format = "compact"
log_transfers = true
"#;

#[tokio::test]
async fn test_load_toml_config() {
    let config = ConfigLoader::new()
        .load_from_string(TOML_CONFIG, ConfigFormat::Toml)
        .unwrap();

    assert_eq!(config.buckets.len(), 2);
    assert_eq!(config.buckets["media"]["region"], "eu-west-1");
    let profile = config.signing_profile("cdn").unwrap();
    assert_eq!(profile.scheme, "gs");
    assert_eq!(profile.expires_in_secs, 600);
    assert!(config.bucket_options().log);
}

#[tokio::test]
async fn test_load_yaml_config() {
    let yaml = r#"
buckets:
  assets:
    project_id: my-project
    bucketName: assets
signing:
  local:
    type: minio
    urls: ["http://localhost:9000/assets/"]
"#;
    let config = ConfigLoader::new()
        .load_from_string(yaml, ConfigFormat::Yaml)
        .unwrap();

    assert_eq!(config.buckets["assets"]["project_id"], "my-project");
    let profile = config.signing_profile("local").unwrap();
    assert_eq!(profile.expires_in_secs, 3600);
    assert_eq!(config.logging.format, "pretty");
    assert!(!config.bucket_options().log);
}

#[tokio::test]
async fn test_load_json_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cloud-bucket.json");
    fs::write(
        &path,
        r#"{"buckets": {"media": {"bucket": "media", "access_key_id": "id", "access_key_secret": "s"}}}"#,
    )
    .unwrap();

    let config = ConfigLoader::new().load_file(&path).await.unwrap();
    assert!(config.bucket_config("media").is_ok());
}

#[tokio::test]
async fn test_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let err = ConfigLoader::new()
        .load_file(temp_dir.path().join("absent.toml"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound(_)));
}

#[tokio::test]
async fn test_invalid_bucket_rejected() {
    let toml = r#"
[buckets.broken]
bucket_name = "media"
"#;
    let err = ConfigLoader::new()
        .load_from_string(toml, ConfigFormat::Toml)
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { field, .. } if field == "buckets.broken"));
}

#[tokio::test]
async fn test_syntax_error_reported_per_format() {
    let loader = ConfigLoader::new();
    assert!(matches!(
        loader.load_from_string("[buckets", ConfigFormat::Toml),
        Err(ConfigError::TomlParseError(_))
    ));
    assert!(matches!(
        loader.load_from_string("{", ConfigFormat::Json),
        Err(ConfigError::JsonParseError(_))
    ));
    assert!(matches!(
        loader.load_from_string("buckets: [", ConfigFormat::Yaml),
        Err(ConfigError::YamlParseError(_))
    ));
}

#[tokio::test]
async fn test_sign_url_with_key_file() {
    let temp_dir = TempDir::new().unwrap();
    let key_path = temp_dir.path().join("cdn.key");
    fs::write(&key_path, HMAC_KEY).unwrap();

    let yaml = format!(
        r#"
signing:
  cdn:
    type: gs
    key_name: my-key
    key_path: {}
    urls: ["https://cdn.example.com/videos/*"]
"#,
        key_path.display()
    );
    let config = ConfigLoader::new()
        .load_from_string(&yaml, ConfigFormat::Yaml)
        .unwrap();

    let signed = config
        .sign_url("https://cdn.example.com/videos/a.mp4")
        .await
        .unwrap();
    assert!(signed.starts_with("https://cdn.example.com/videos/a.mp4?Expires="));
    assert!(signed.contains("&KeyName=my-key&Signature="));

    let err = config
        .sign_url("https://cdn.example.com/images/a.png")
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownEntry { .. }));
}

#[tokio::test]
async fn test_profile_signers_share_options() {
    let config = ConfigLoader::new()
        .load_from_string(TOML_CONFIG, ConfigFormat::Toml)
        .unwrap();
    let signers = config.signing_profile("cdn").unwrap().signers().await.unwrap();

    assert_eq!(signers.len(), 1);
    assert_eq!(signers[0].prefix(), "https://cdn.example.com/videos/");
    assert!(signers[0].sign("a.mp4").unwrap().contains("&KeyName=my-key&"));
}

#[tokio::test]
async fn test_missing_key_file_surfaces_io_error() {
    let toml = r#"
[signing.cdn]
type = "gs"
key_name = "my-key"
key_path = "/nonexistent/cloud-bucket/cdn.key"
urls = ["https://cdn.example.com/"]
"#;
    let config = ConfigLoader::new()
        .load_from_string(toml, ConfigFormat::Toml)
        .unwrap();
    let err = config
        .sign_url("https://cdn.example.com/a.mp4")
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::IoError(_)));
}

#[tokio::test]
async fn test_connect_unknown_bucket() {
    let err = Config::default().connect_bucket("media").await.unwrap_err();
    assert!(matches!(err, ConfigError::UnknownEntry { kind: "bucket", .. }));
}

#[tokio::test]
async fn test_env_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cloud-bucket.toml");
    fs::write(&path, TOML_CONFIG).unwrap();

    std::env::set_var("CLOUD_BUCKET_LOG_LEVEL", "debug");
    std::env::set_var("CLOUD_BUCKET_LOG_FORMAT", "json");
    std::env::set_var("CLOUD_BUCKET_LOG_TRANSFERS", "off");
    let config = ConfigLoader::new().load_with_overrides(&path).await.unwrap();
    assert_eq!(config.logging.level.as_deref(), Some("debug"));
    assert_eq!(config.logging.format, "json");
    assert!(!config.logging.log_transfers);
    assert!(config.validate().is_ok());

    std::env::set_var("CLOUD_BUCKET_LOG_TRANSFERS", "sometimes");
    let err = ConfigLoader::new().load_with_overrides(&path).await.unwrap_err();
    assert!(matches!(err, ConfigError::EnvVarParsingError { .. }));

    std::env::remove_var("CLOUD_BUCKET_LOG_LEVEL");
    std::env::remove_var("CLOUD_BUCKET_LOG_FORMAT");
    std::env::remove_var("CLOUD_BUCKET_LOG_TRANSFERS");
}

#[tokio::test]
async fn test_merge_files() {
    let temp_dir = TempDir::new().unwrap();
    let base = temp_dir.path().join("base.toml");
    let local = temp_dir.path().join("local.yaml");
    fs::write(&base, TOML_CONFIG).unwrap();
    fs::write(
        &local,
        "buckets:\n  media:\n    bucket_name: media-dev\n    access_key_id: dev\n    access_key_secret: dev\n",
    )
    .unwrap();

    let config = ConfigLoader::new()
        .load_and_merge(&[&base, &local])
        .await
        .unwrap();
    assert_eq!(config.buckets["media"]["bucket_name"], "media-dev");
    assert!(config.buckets.contains_key("local"));
    assert_eq!(config.logging.format, "compact");
}
