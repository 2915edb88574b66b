use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Service configuration, loadable from a TOML file with environment
/// variable overrides for deployment secrets.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Upstream weather provider settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Raw-response cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Relational store settings
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the timeline weather API
    pub base_url: Option<String>,

    /// API key credential sent with every request
    pub api_key: Option<String>,

    /// Outbound request timeout in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider_timeout_secs() -> u64 {
    10
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Path to the cache database. Absence is a construction-time error
    /// for the cache client, not a silent no-cache mode.
    pub db_path: Option<PathBuf>,

    /// TTL applied to weather entries, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_ttl_secs() -> u64 {
    86400
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: default_data_file("cache.db"),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the weather database
    pub db_path: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_path: default_data_file("weather.db"),
        }
    }
}

fn default_data_file(name: &str) -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("vane").join(name))
}

impl Config {
    /// Load configuration from a TOML file, then apply environment
    /// variable overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::NotFound(path.display().to_string()))?;
        let mut config: Config =
            toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Build a configuration from defaults and environment variables only.
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Environment variables win over file values, so deployments can keep
    /// credentials out of the config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("WEATHER_API_URL") {
            self.provider.base_url = Some(v);
        }
        if let Ok(v) = std::env::var("WEATHER_API_KEY") {
            self.provider.api_key = Some(v);
        }
        if let Ok(v) = std::env::var("VANE_CACHE_DB") {
            self.cache.db_path = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var("VANE_WEATHER_DB") {
            self.database.db_path = Some(PathBuf::from(v));
        }
    }

    /// Validate the configuration, collecting errors and warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        match &self.provider.base_url {
            None => result.add_error("provider.base_url", "weather url is missing"),
            Some(raw) => {
                if Url::parse(raw).is_err() {
                    result.add_error("provider.base_url", format!("not a valid URL: {}", raw));
                }
            }
        }

        match &self.provider.api_key {
            None => result.add_error("provider.api_key", "api key is missing"),
            Some(key) if key.is_empty() => {
                result.add_error("provider.api_key", "api key is empty");
            }
            Some(_) => {}
        }

        if self.provider.timeout_secs == 0 {
            result.add_warning("provider.timeout_secs", "timeout of 0 disables the deadline");
        }

        if self.cache.db_path.is_none() {
            result.add_error("cache.db_path", "no cache backend configured");
        }

        if self.database.db_path.is_none() {
            result.add_error("database.db_path", "no weather database configured");
        }

        result
    }
}
