//! Integration tests for configuration validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use mc_protocol::config::{ClientConfig, LoggingConfig, NetworkConfig, WorldConfig};
use mc_protocol::error::ProtocolError;
use std::time::Duration;
use tracing::Level;

#[test]
fn test_default_config_validates() {
    let config = NetworkConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
    assert!(config.validate_strict().is_ok());
}

#[test]
fn test_empty_host() {
    let mut config = NetworkConfig::default();
    config.client.host = "  ".to_string();

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Host cannot be empty")));
}

#[test]
fn test_zero_port() {
    let mut config = NetworkConfig::default();
    config.client.port = 0;

    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Port must be greater than 0")));
}

#[test]
fn test_connect_timeout_bounds() {
    let mut config = NetworkConfig::default();
    config.client.connect_timeout = Duration::from_millis(10);
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Connect timeout too short")));

    config.client.connect_timeout = Duration::from_secs(120);
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Connect timeout too long")));
}

#[test]
fn test_max_packet_size_bounds() {
    let client = ClientConfig {
        max_packet_size: 10,
        ..ClientConfig::default()
    };
    assert!(client
        .validate()
        .iter()
        .any(|e| e.contains("Max packet size too small")));
}

#[test]
fn test_view_distance_range() {
    let world = WorldConfig {
        view_distance: -1,
        chunk_quota: None,
    };
    assert!(world
        .validate()
        .iter()
        .any(|e| e.contains("Invalid view distance")));

    let world = WorldConfig {
        view_distance: 12,
        chunk_quota: Some(0),
    };
    assert!(world
        .validate()
        .iter()
        .any(|e| e.contains("Chunk quota must be greater than 0")));
}

#[test]
fn test_empty_app_name() {
    let logging = LoggingConfig {
        app_name: String::new(),
        ..LoggingConfig::default()
    };
    assert!(logging
        .validate()
        .iter()
        .any(|e| e.contains("Application name cannot be empty")));
}

#[test]
fn test_multiple_errors_reported_together() {
    let config = NetworkConfig::default_with_overrides(|c| {
        c.client.port = 0;
        c.client.event_capacity = 0;
        c.world.view_distance = 100;
    });

    assert_eq!(config.validate().len(), 3);
    match config.validate_strict() {
        Err(ProtocolError::ConfigError(message)) => {
            assert!(message.contains("Configuration validation failed"));
            assert!(message.contains("Port must be greater than 0"));
        }
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn test_toml_parsing() {
    let config = NetworkConfig::from_toml(
        r#"
        [client]
        host = "play.example.net"
        port = 25566
        protocol_version = 736
        connect_timeout = 3000
        read_buffer_size = 8192
        max_packet_size = 2097151
        event_capacity = 64

        [world]
        view_distance = 6

        [logging]
        app_name = "bot"
        log_level = "debug"
        json_format = true
        "#,
    )
    .unwrap();

    assert_eq!(config.client.host, "play.example.net");
    assert_eq!(config.client.port, 25566);
    assert_eq!(config.client.connect_timeout, Duration::from_secs(3));
    assert_eq!(config.client.read_buffer_size, 8192);
    assert_eq!(config.world.view_distance, 6);
    assert_eq!(config.world.chunk_quota, None);
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(config.logging.json_format);
}

#[test]
fn test_invalid_toml_rejected() {
    let result = NetworkConfig::from_toml("[client\nport = 1");
    assert!(matches!(result, Err(ProtocolError::ConfigError(_))));

    let result = NetworkConfig::from_toml("[logging]\nlog_level = \"loud\"");
    assert!(matches!(result, Err(ProtocolError::ConfigError(_))));
}

#[test]
fn test_save_and_reload() {
    let path = std::env::temp_dir().join(format!("mc-protocol-{}.toml", std::process::id()));
    let config = NetworkConfig::default_with_overrides(|c| {
        c.client.host = "10.0.0.5".to_string();
        c.world.chunk_quota = Some(49);
    });

    config.save_to_file(&path).unwrap();
    let loaded = NetworkConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded.client.host, "10.0.0.5");
    assert_eq!(loaded.world.chunk_quota, Some(49));
    assert_eq!(loaded.client.connect_timeout, config.client.connect_timeout);
}

#[test]
fn test_missing_file_is_config_error() {
    let result = NetworkConfig::from_file("/definitely/not/here.toml");
    assert!(matches!(result, Err(ProtocolError::ConfigError(_))));
}
