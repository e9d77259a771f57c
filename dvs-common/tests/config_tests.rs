//! Unit tests for configuration resolution and graceful degradation
//!
//! Tests cover:
//! - Missing TOML files do not prevent startup (defaults are used)
//! - Priority order CLI → ENV → TOML → default
//! - Places API key pickup from the environment
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate DVS_DATA_FOLDER or GOOGLE_PLACES_API_KEY are marked
//! with #[serial] so they run sequentially.

use dvs_common::config::{
    default_data_folder, resolve_data_folder, ConfigOverrides, ServiceConfig, TomlConfig,
    DATA_FOLDER_ENV, PLACES_API_KEY_ENV,
};
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

#[test]
fn test_missing_toml_file_uses_defaults() {
    let config = TomlConfig::load(Path::new("/nonexistent/dvs/dvs.toml")).unwrap();
    assert_eq!(config.server.port, 8000);
    assert!(config.sources.places_api_key.is_none());
}

#[test]
fn test_toml_file_is_loaded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
data_folder = "/srv/dvs"

[server]
port = 9100

[sources]
request_timeout_secs = 3
directories_enabled = false
"#
    )
    .unwrap();

    let config = TomlConfig::load(file.path()).unwrap();
    assert_eq!(config.server.port, 9100);
    assert_eq!(config.data_folder, Some(PathBuf::from("/srv/dvs")));
    assert_eq!(config.sources.request_timeout_secs, 3);
    assert!(!config.sources.directories_enabled);
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    env::remove_var(DATA_FOLDER_ENV);

    let folder = resolve_data_folder(None, DATA_FOLDER_ENV, None);
    assert_eq!(folder, default_data_folder());
}

#[test]
#[serial]
fn test_env_beats_toml_for_data_folder() {
    env::set_var(DATA_FOLDER_ENV, "/tmp/dvs-test-env-folder");

    let folder = resolve_data_folder(None, DATA_FOLDER_ENV, Some(Path::new("/tmp/from-toml")));
    assert_eq!(folder, PathBuf::from("/tmp/dvs-test-env-folder"));

    env::remove_var(DATA_FOLDER_ENV);
}

#[test]
#[serial]
fn test_service_config_resolution() {
    env::remove_var(DATA_FOLDER_ENV);
    env::remove_var(PLACES_API_KEY_ENV);

    let toml_config = TomlConfig::from_toml_str(
        r#"
        data_folder = "/tmp/dvs-toml"

        [server]
        port = 9000
        "#,
    )
    .unwrap();

    let overrides = ConfigOverrides {
        port: Some(9200),
        ..Default::default()
    };

    let config = ServiceConfig::resolve(toml_config, overrides).unwrap();
    assert_eq!(config.listen_addr.port(), 9200);
    assert_eq!(config.data_folder, PathBuf::from("/tmp/dvs-toml"));
    assert_eq!(config.database_path, PathBuf::from("/tmp/dvs-toml/dvs.db"));
    assert!(config.sources.places_api_key.is_none());
}

#[test]
#[serial]
fn test_places_key_from_environment() {
    env::set_var(PLACES_API_KEY_ENV, "env-key");

    let toml_config = TomlConfig::from_toml_str(
        r#"
        [sources]
        places_api_key = "toml-key"
        "#,
    )
    .unwrap();

    let config = ServiceConfig::resolve(toml_config, ConfigOverrides::default()).unwrap();
    assert_eq!(config.sources.places_api_key.as_deref(), Some("env-key"));

    env::remove_var(PLACES_API_KEY_ENV);
}

#[test]
#[serial]
fn test_blank_places_key_disables_source() {
    env::remove_var(PLACES_API_KEY_ENV);

    let toml_config = TomlConfig::from_toml_str(
        r#"
        [sources]
        places_api_key = "   "
        "#,
    )
    .unwrap();

    let config = ServiceConfig::resolve(toml_config, ConfigOverrides::default()).unwrap();
    assert!(config.sources.places_api_key.is_none());
}

#[test]
fn test_invalid_matching_config_fails_resolution() {
    let toml_config = TomlConfig::from_toml_str(
        r#"
        [matching]
        candidate_threshold = -0.1
        "#,
    )
    .unwrap();

    assert!(ServiceConfig::resolve(toml_config, ConfigOverrides::default()).is_err());
}
