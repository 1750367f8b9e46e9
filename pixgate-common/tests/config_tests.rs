//! Unit tests for API configuration resolution
//!
//! Covers the priority order CLI > environment > TOML > compiled default and
//! graceful handling of missing or malformed config files.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate PIXGATE_API_BASE are marked with #[serial].

use pixgate_common::config::{
    load_toml_config, ConfigResolver, TomlConfig, API_BASE_ENV_VAR, DEFAULT_API_BASE,
    DEFAULT_MAX_FILES,
};
use pixgate_common::{CapacityPolicy, Error};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::time::Duration;

fn toml_with_base(base: &str) -> TomlConfig {
    TomlConfig {
        api_base: Some(base.to_string()),
        ..TomlConfig::default()
    }
}

#[test]
#[serial]
fn test_default_when_nothing_configured() {
    env::remove_var(API_BASE_ENV_VAR);

    let resolver = ConfigResolver::with_toml(None, TomlConfig::default());
    let config = resolver.resolve().unwrap();

    assert_eq!(config.api_base, DEFAULT_API_BASE);
    assert_eq!(config.max_files, DEFAULT_MAX_FILES);
    assert_eq!(config.capacity_policy, CapacityPolicy::Append);
    assert!(config.request_timeout.is_none());
}

#[test]
#[serial]
fn test_cli_overrides_env_and_toml() {
    env::set_var(API_BASE_ENV_VAR, "http://env-host:8000");

    let resolver = ConfigResolver::with_toml(
        Some("http://cli-host:8000/"),
        toml_with_base("http://toml-host:8000"),
    );
    assert_eq!(resolver.resolve().unwrap().api_base, "http://cli-host:8000");

    env::remove_var(API_BASE_ENV_VAR);
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    env::set_var(API_BASE_ENV_VAR, "http://env-host:8000");

    let resolver = ConfigResolver::with_toml(None, toml_with_base("http://toml-host:8000"));
    assert_eq!(resolver.resolve_api_base(), "http://env-host:8000");

    env::remove_var(API_BASE_ENV_VAR);
}

#[test]
#[serial]
fn test_blank_env_falls_through_to_toml() {
    env::set_var(API_BASE_ENV_VAR, "   ");

    let resolver = ConfigResolver::with_toml(None, toml_with_base("http://toml-host:8000"));
    assert_eq!(resolver.resolve_api_base(), "http://toml-host:8000");

    env::remove_var(API_BASE_ENV_VAR);
}

#[test]
#[serial]
fn test_toml_file_supplies_batch_settings() {
    env::remove_var(API_BASE_ENV_VAR);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
api_base = "http://screening.local:8000"
max_files = 5
capacity_policy = "replace"
request_timeout_secs = 30

[logging]
level = "debug"
"#
    )
    .unwrap();

    let resolver = ConfigResolver::new(None, Some(file.path()));
    let config = resolver.resolve().unwrap();

    assert_eq!(config.api_base, "http://screening.local:8000");
    assert_eq!(config.max_files, 5);
    assert_eq!(config.capacity_policy, CapacityPolicy::Replace);
    assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    assert_eq!(resolver.toml().logging.level, "debug");
    assert_eq!(resolver.config_path(), Some(file.path()));
    assert!(resolver.load_error().is_none());
}

#[test]
#[serial]
fn test_malformed_toml_does_not_abort_resolution() {
    env::remove_var(API_BASE_ENV_VAR);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "api_base = [not valid").unwrap();

    assert!(load_toml_config(file.path()).is_err());

    let resolver = ConfigResolver::new(None, Some(file.path()));
    assert_eq!(resolver.resolve().unwrap().api_base, DEFAULT_API_BASE);

    // The failure is kept for the caller to report
    let err = resolver.load_error().expect("malformed file should be recorded");
    assert!(matches!(err, Error::Config(_)));
    assert!(err.to_string().contains("Parse"));
    assert_eq!(resolver.config_path(), Some(file.path()));
}

#[test]
#[serial]
fn test_missing_explicit_file_is_recorded() {
    env::remove_var(API_BASE_ENV_VAR);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    let resolver = ConfigResolver::new(Some("http://cli-host:8000"), Some(&path));

    assert!(matches!(resolver.load_error(), Some(Error::Config(_))));
    assert_eq!(resolver.resolve().unwrap().api_base, "http://cli-host:8000");
}

#[test]
#[serial]
fn test_zero_timeout_means_no_timeout() {
    env::remove_var(API_BASE_ENV_VAR);

    let toml = TomlConfig {
        request_timeout_secs: Some(0),
        ..TomlConfig::default()
    };
    let config = ConfigResolver::with_toml(None, toml).resolve().unwrap();

    assert!(config.request_timeout.is_none());
}

#[test]
#[serial]
fn test_invalid_base_is_rejected() {
    env::remove_var(API_BASE_ENV_VAR);

    let resolver = ConfigResolver::with_toml(Some("localhost:8000"), TomlConfig::default());
    assert!(resolver.resolve().is_err());
}
