//! Configuration management for weathergrid
//!
//! Handles loading configuration from files and environment variables,
//! and validates all settings.

use crate::WeatherGridError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Weather API configuration
    #[serde(default)]
    pub weather: WeatherConfig,
    /// City dataset configuration
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// JSON export configuration
    #[serde(default)]
    pub export: ExportConfig,
    /// Default query settings
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Weather API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// Base URL of the forecast API
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
    /// Base URL of the geocoding API
    #[serde(default = "default_geocoding_url")]
    pub geocoding_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_weather_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for failed requests
    #[serde(default = "default_weather_max_retries")]
    pub max_retries: u32,
    /// Client-side request budget
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Number of forecast days per location
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
}

/// City dataset settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// CSV file with `city`, `lat` and `lng` columns
    #[serde(default = "default_catalog_path")]
    pub path: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// JSON export settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory the `weatherInfo*.json` files are written to
    #[serde(default = "default_export_directory")]
    pub directory: String,
}

/// Default query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Search radius in kilometers
    #[serde(default = "default_radius")]
    pub radius_km: f64,
}

// Default value functions
fn default_weather_base_url() -> String {
    "https://api.open-meteo.com/v1".to_string()
}

fn default_geocoding_url() -> String {
    "https://geocoding-api.open-meteo.com/v1".to_string()
}

fn default_weather_timeout() -> u32 {
    30
}

fn default_weather_max_retries() -> u32 {
    3
}

fn default_requests_per_minute() -> u32 {
    500
}

fn default_forecast_days() -> u32 {
    5
}

fn default_catalog_path() -> String {
    "worldcities.csv".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_export_directory() -> String {
    ".".to_string()
}

fn default_radius() -> f64 {
    50.0
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: default_weather_base_url(),
            geocoding_url: default_geocoding_url(),
            timeout_seconds: default_weather_timeout(),
            max_retries: default_weather_max_retries(),
            requests_per_minute: default_requests_per_minute(),
            forecast_days: default_forecast_days(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            path: default_catalog_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: default_export_directory(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            radius_km: default_radius(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // WEATHERGRID_WEATHER__MAX_RETRIES=5 overrides weather.max_retries
        builder = builder.add_source(
            Environment::with_prefix("WEATHERGRID")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: AppConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("weathergrid").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.weather.base_url.is_empty() {
            self.weather.base_url = default_weather_base_url();
        }
        if self.weather.geocoding_url.is_empty() {
            self.weather.geocoding_url = default_geocoding_url();
        }
        if self.weather.timeout_seconds == 0 {
            self.weather.timeout_seconds = default_weather_timeout();
        }
        if self.weather.requests_per_minute == 0 {
            self.weather.requests_per_minute = default_requests_per_minute();
        }
        if self.weather.forecast_days == 0 {
            self.weather.forecast_days = default_forecast_days();
        }
        if self.catalog.path.is_empty() {
            self.catalog.path = default_catalog_path();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
        if self.export.directory.is_empty() {
            self.export.directory = default_export_directory();
        }
        if self.defaults.radius_km == 0.0 {
            self.defaults.radius_km = default_radius();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.weather.timeout_seconds > 300 {
            return Err(
                WeatherGridError::config("Weather API timeout cannot exceed 300 seconds").into(),
            );
        }

        if self.weather.max_retries > 10 {
            return Err(WeatherGridError::config("Weather API max retries cannot exceed 10").into());
        }

        if self.weather.requests_per_minute == 0 {
            return Err(WeatherGridError::config(
                "Weather API requests per minute must be at least 1",
            )
            .into());
        }

        if !(1..=16).contains(&self.weather.forecast_days) {
            return Err(
                WeatherGridError::config("Forecast days must be between 1 and 16").into(),
            );
        }

        if !(10.0..=500.0).contains(&self.defaults.radius_km) {
            return Err(WeatherGridError::config(
                "Default radius must be between 10 and 500 km",
            )
            .into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(WeatherGridError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(WeatherGridError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        for url in [&self.weather.base_url, &self.weather.geocoding_url] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(WeatherGridError::config(format!(
                    "Weather API URL must be a valid HTTP or HTTPS URL, got '{url}'"
                ))
                .into());
            }
        }

        Ok(())
    }
}
