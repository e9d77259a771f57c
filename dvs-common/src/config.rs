//! Configuration loading and data folder resolution
//!
//! Resolution priority for every bootstrap value:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not an error: the service logs a warning and starts
//! with compiled defaults. A TOML file that exists but does not parse is a
//! configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the data folder
pub const DATA_FOLDER_ENV: &str = "DVS_DATA_FOLDER";

/// Environment variable supplying the places API key
pub const PLACES_API_KEY_ENV: &str = "GOOGLE_PLACES_API_KEY";

/// Database file name inside the data folder
pub const DATABASE_FILE: &str = "dvs.db";

// ============================================================================
// TOML file sections
// ============================================================================

/// Bootstrap configuration loaded from TOML file
///
/// Every section is optional; omitted sections and keys take compiled defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding the report database (optional)
    pub data_folder: Option<PathBuf>,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub matching: MatchingConfig,
    pub sources: SourcesConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: IpAddr,
    pub port: u16,
    /// Upper bound on uploaded document size
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: IpAddr::from([127, 0, 0, 1]),
            port: 8000,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Report store settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file (defaults to `<data_folder>/dvs.db`)
    pub path: Option<PathBuf>,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 10,
            acquire_timeout_secs: 30,
        }
    }
}

/// Heuristic constants used by candidate selection and field comparison
///
/// These values were hand-tuned; they are kept configurable rather than
/// hard-coded so deployments can adjust them without a rebuild.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Weight of name similarity in the candidate score
    pub name_weight: f64,
    /// Weight of the specialty hit in the candidate score
    pub specialty_weight: f64,
    /// A candidate must score strictly above this to be admitted
    pub candidate_threshold: f64,
    /// Minimum name similarity for a name match
    pub name_threshold: f64,
    /// Minimum address similarity for an address match
    pub address_threshold: f64,
    /// License values that mean "no license on file"
    pub license_placeholders: Vec<String>,
    /// Canonical specialty term → aliases accepted when pairing a license with a specialty
    pub specialty_synonyms: BTreeMap<String, Vec<String>>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        let mut specialty_synonyms = BTreeMap::new();
        specialty_synonyms.insert("family medicine".to_string(), vec!["family".to_string()]);
        specialty_synonyms.insert(
            "cardiology".to_string(),
            vec!["cardio".to_string(), "heart".to_string()],
        );

        Self {
            name_weight: 0.7,
            specialty_weight: 0.3,
            candidate_threshold: 0.5,
            name_threshold: 0.8,
            address_threshold: 0.6,
            license_placeholders: vec!["--".to_string(), "N/A".to_string()],
            specialty_synonyms,
        }
    }
}

impl MatchingConfig {
    /// Reject values outside the unit interval
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("name_weight", self.name_weight),
            ("specialty_weight", self.specialty_weight),
            ("candidate_threshold", self.candidate_threshold),
            ("name_threshold", self.name_threshold),
            ("address_threshold", self.address_threshold),
        ];

        for (key, value) in checks {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "matching.{} must be within 0.0..=1.0 (got {})",
                    key, value
                )));
            }
        }

        Ok(())
    }
}

/// Evidence source settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Per outbound request timeout
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub registry_url: String,
    pub registry_limit: u32,
    pub directories_enabled: bool,
    pub healthgrades_search_url: String,
    pub webmd_search_url: String,
    /// Places source is disabled when no key is configured
    pub places_api_key: Option<String>,
    pub places_text_search_url: String,
    pub places_details_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            user_agent: concat!("dvs/", env!("CARGO_PKG_VERSION")).to_string(),
            registry_url: "https://npiregistry.cms.hhs.gov/api/".to_string(),
            registry_limit: 10,
            directories_enabled: true,
            healthgrades_search_url: "https://www.healthgrades.com/usearch".to_string(),
            webmd_search_url: "https://doctor.webmd.com/search".to_string(),
            places_api_key: None,
            places_text_search_url: "https://maps.googleapis.com/maps/api/place/textsearch/json"
                .to_string(),
            places_details_url: "https://maps.googleapis.com/maps/api/place/details/json"
                .to_string(),
        }
    }
}

impl SourcesConfig {
    pub fn request_timeout(&self) -> Duration {
        crate::time::secs_to_duration(self.request_timeout_secs)
    }
}

/// Cross-origin settings for browser front-ends
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:3000".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Load TOML config, falling back to defaults when the file is missing
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config = Self::from_toml_str(&content)?;
        info!("Loaded TOML configuration from {}", path.display());
        Ok(config)
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Command-line overrides (clap fills these, including their ENV fallbacks)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind: Option<IpAddr>,
    pub port: Option<u16>,
    pub data_folder: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen_addr: SocketAddr,
    pub max_upload_bytes: usize,
    pub data_folder: PathBuf,
    pub database_path: PathBuf,
    pub database: DatabaseConfig,
    pub matching: MatchingConfig,
    pub sources: SourcesConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Merge CLI overrides, environment and TOML values over compiled defaults
    pub fn resolve(toml_config: TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        toml_config.matching.validate()?;

        let data_folder = resolve_data_folder(
            overrides.data_folder.as_deref(),
            DATA_FOLDER_ENV,
            toml_config.data_folder.as_deref(),
        );

        let database_path = overrides
            .database_path
            .or_else(|| toml_config.database.path.clone())
            .unwrap_or_else(|| data_folder.join(DATABASE_FILE));

        let bind = overrides.bind.unwrap_or(toml_config.server.bind);
        let port = overrides.port.unwrap_or(toml_config.server.port);

        let mut sources = toml_config.sources;
        if let Some(key) = std::env::var(PLACES_API_KEY_ENV)
            .ok()
            .filter(|k| is_valid_key(k))
        {
            if sources.places_api_key.is_some() {
                warn!(
                    "Places API key found in both {} and TOML. Using environment (higher priority).",
                    PLACES_API_KEY_ENV
                );
            }
            sources.places_api_key = Some(key);
        }
        sources.places_api_key = sources.places_api_key.filter(|k| is_valid_key(k));

        Ok(Self {
            listen_addr: SocketAddr::new(bind, port),
            max_upload_bytes: toml_config.server.max_upload_bytes,
            data_folder,
            database_path,
            database: toml_config.database,
            matching: toml_config.matching,
            sources,
            cors: toml_config.cors,
            logging: toml_config.logging,
        })
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Data folder resolution: CLI → ENV → TOML → platform default
pub fn resolve_data_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml_value: Option<&Path>,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = toml_value {
        return path.to_path_buf();
    }

    default_data_folder()
}

/// Get OS-dependent default data folder path
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("dvs"))
        .unwrap_or_else(|| PathBuf::from("./dvs_data"))
}

/// Get default configuration file path for the platform
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("dvs").join("dvs.toml"))
        .unwrap_or_else(|| PathBuf::from("dvs.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matching_constants() {
        let m = MatchingConfig::default();
        assert_eq!(m.name_weight, 0.7);
        assert_eq!(m.specialty_weight, 0.3);
        assert_eq!(m.candidate_threshold, 0.5);
        assert_eq!(m.name_threshold, 0.8);
        assert_eq!(m.address_threshold, 0.6);
        assert_eq!(m.license_placeholders, vec!["--", "N/A"]);
        assert_eq!(m.specialty_synonyms["cardiology"], vec!["cardio", "heart"]);
    }

    #[test]
    fn test_matching_validate_rejects_out_of_range() {
        let m = MatchingConfig {
            address_threshold: 1.5,
            ..MatchingConfig::default()
        };
        let err = m.validate().unwrap_err();
        assert!(err.to_string().contains("address_threshold"));
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.cors.allowed_origins.len(), 4);
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            [matching]
            name_threshold = 0.9

            [matching.specialty_synonyms]
            dermatology = ["derm", "skin"]
            "#,
        )
        .unwrap();

        assert_eq!(config.matching.name_threshold, 0.9);
        assert_eq!(config.matching.address_threshold, 0.6);
        assert_eq!(config.matching.specialty_synonyms.len(), 1);
        assert_eq!(config.matching.specialty_synonyms["dermatology"], vec!["derm", "skin"]);
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[server\nport = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }

    #[test]
    fn test_cli_data_folder_wins() {
        let folder = resolve_data_folder(
            Some(Path::new("/tmp/from-cli")),
            "DVS_TEST_UNUSED_ENV",
            Some(Path::new("/tmp/from-toml")),
        );
        assert_eq!(folder, PathBuf::from("/tmp/from-cli"));
    }
}
