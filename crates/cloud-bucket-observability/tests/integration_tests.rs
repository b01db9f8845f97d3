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
//! Logging configuration and subscriber installation
//!
//! Environment precedence is checked in one test since tests in this file
//! share the process environment.

use cloud_bucket_observability::{
    init_tracing_with_config, LogConfig, LogError, LogFormat, LogOutput, LOG_ENV_VAR,
};

#[test]
fn test_config_builder_chaining() {
    let config = LogConfig::new()
        .with_format(LogFormat::Json)
        .with_level("debug")
        .with_timestamps(false)
        .with_color(false)
        .with_thread_ids(true)
        .with_targets(false)
        .with_output(LogOutput::Stdout);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level.as_deref(), Some("debug"));
    assert!(!config.use_timestamps);
    assert!(!config.use_color);
    assert!(config.include_thread_ids);
    assert!(!config.include_targets);
    assert_eq!(config.output, LogOutput::Stdout);
}

#[test]
fn test_default_config() {
    let config = LogConfig::default();
    assert_eq!(config.format, LogFormat::Pretty);
    assert_eq!(config.output, LogOutput::Stderr);
    assert!(config.use_color);
    assert!(config.use_timestamps);
    assert!(config.level.is_none());
}

#[test]
fn test_level_precedence() {
    std::env::set_var("RUST_LOG", "trace");
    std::env::set_var(LOG_ENV_VAR, "cloud_bucket_storage=debug");

    let config = LogConfig::new();
    assert_eq!(config.effective_level(), "cloud_bucket_storage=debug");
    assert_eq!(config.clone().with_level("warn").effective_level(), "warn");

    std::env::remove_var(LOG_ENV_VAR);
    assert_eq!(config.effective_level(), "trace");

    std::env::remove_var("RUST_LOG");
    assert_eq!(config.effective_level(), "info");
}

#[test]
fn test_second_initialization_fails() {
    let config = LogConfig::new()
        .with_format(LogFormat::Compact)
        .with_level("warn")
        .with_color(false);

    // Only this test installs a subscriber in this binary.
    init_tracing_with_config(&config).unwrap();
    assert!(matches!(
        init_tracing_with_config(&config),
        Err(LogError::AlreadyInitialized(_))
    ));
}

#[test]
fn test_invalid_filter_is_rejected_before_install() {
    let config = LogConfig::new().with_level("cloud_bucket_storage=loud");
    assert!(matches!(
        init_tracing_with_config(&config),
        Err(LogError::InvalidFilter { .. })
    ));
}
