use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable overriding `api.base_url`.
pub const API_URL_ENV: &str = "SKYCAST_API_URL";

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

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Weather proxy settings
    #[serde(default)]
    pub api: ApiConfig,

    /// Query scheduling
    #[serde(default)]
    pub search: SearchConfig,

    /// Device position used to pick a starting location
    #[serde(default)]
    pub geolocation: GeolocationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the weather proxy (serves `/api/search/...` and `/api/location/...`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout; the transport default applies when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: None,
        }
    }
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Throttle and debounce window in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: u64,

    /// Trimmed queries at least this long are debounced, shorter ones throttled
    #[serde(default = "default_debounce_threshold")]
    pub debounce_threshold: usize,
}

fn default_window_ms() -> u64 {
    500
}

fn default_debounce_threshold() -> usize {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            window_ms: default_window_ms(),
            debounce_threshold: default_debounce_threshold(),
        }
    }
}

impl SearchConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeolocationConfig {
    /// Whether to look up the current location at startup
    #[serde(default = "default_geolocation_enabled")]
    pub enabled: bool,

    /// Fixed device latitude; terminals have no position sensor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,

    /// Fixed device longitude
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

fn default_geolocation_enabled() -> bool {
    true
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        Self {
            enabled: default_geolocation_enabled(),
            latitude: None,
            longitude: None,
        }
    }
}

impl GeolocationConfig {
    /// Configured coordinates, if both halves are present
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(long)) => Some((lat, long)),
            _ => None,
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing.
    ///
    /// `SKYCAST_API_URL` overrides `api.base_url` when set.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            Self::load_from(&config_path)?
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            config
        };

        if let Ok(url) = std::env::var(API_URL_ENV) {
            tracing::debug!("Using {} from environment", API_URL_ENV);
            config.api.base_url = url;
        }

        Ok(config)
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::Missing(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::Malformed(e.to_string()))?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.api.base_url, "api.base_url", &mut result);

        if self.api.request_timeout_secs == Some(0) {
            result.add_error("api.request_timeout_secs", "Timeout must be greater than 0");
        }

        if self.search.window_ms == 0 {
            result.add_warning(
                "search.window_ms",
                "Throttle/debounce disabled (0 ms); every keystroke hits the network",
            );
        } else if self.search.window_ms > 5000 {
            result.add_warning("search.window_ms", "Search delay is more than 5 seconds");
        }

        if self.search.debounce_threshold == 0 {
            result.add_warning(
                "search.debounce_threshold",
                "Threshold 0 debounces every query",
            );
        }

        let geo = &self.geolocation;
        match (geo.latitude, geo.longitude) {
            (Some(lat), Some(long)) => {
                if !(-90.0..=90.0).contains(&lat) {
                    result.add_error("geolocation.latitude", "Latitude must be within -90..90");
                }
                if !(-180.0..=180.0).contains(&long) {
                    result.add_error(
                        "geolocation.longitude",
                        "Longitude must be within -180..180",
                    );
                }
            }
            (Some(_), None) | (None, Some(_)) => {
                result.add_warning(
                    "geolocation",
                    "Only one of latitude/longitude is set; position is ignored",
                );
            }
            (None, None) => {}
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}
