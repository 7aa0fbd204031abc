//! Error types and handling for the weathergrid library

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures reading the city dataset
#[derive(Error, Debug)]
pub enum DataSourceError {
    #[error("City dataset not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("City dataset is empty: {}", path.display())]
    Empty { path: PathBuf },

    #[error("City dataset {} is corrupted or improperly formatted: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },
}

impl DataSourceError {
    pub fn not_found<P: AsRef<Path>>(path: P) -> Self {
        Self::NotFound {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn empty<P: AsRef<Path>>(path: P) -> Self {
        Self::Empty {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn malformed<P: AsRef<Path>, S: Into<String>>(path: P, reason: S) -> Self {
        Self::Malformed {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Main error type for the weathergrid library
#[derive(Error, Debug)]
pub enum WeatherGridError {
    /// City dataset errors
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    /// Out-of-range center, radius or spacing
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Weather API communication errors
    #[error("API error: {message}")]
    Api { message: String },

    /// JSON export errors
    #[error("Export error: {message}")]
    Export { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl WeatherGridError {
    /// Create a new invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new API error
    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    /// Create a new export error
    pub fn export<S: Into<String>>(message: S) -> Self {
        Self::Export {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WeatherGridError::DataSource(err) => {
                format!("Unable to read the city dataset. {err}")
            }
            WeatherGridError::InvalidInput { message } => {
                format!("Invalid input: {message}")
            }
            WeatherGridError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            WeatherGridError::Api { .. } => {
                "Unable to connect to the weather service. Please check your internet connection."
                    .to_string()
            }
            WeatherGridError::Export { message } => {
                format!("Could not write the JSON file: {message}")
            }
            WeatherGridError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let input_err = WeatherGridError::invalid_input("spacing must be positive");
        assert!(matches!(input_err, WeatherGridError::InvalidInput { .. }));

        let api_err = WeatherGridError::api("connection failed");
        assert!(matches!(api_err, WeatherGridError::Api { .. }));

        let data_err: WeatherGridError = DataSourceError::empty("cities.csv").into();
        assert!(matches!(
            data_err,
            WeatherGridError::DataSource(DataSourceError::Empty { .. })
        ));
    }

    #[test]
    fn test_data_source_messages() {
        assert!(
            DataSourceError::not_found("worldcities.csv")
                .to_string()
                .contains("not found: worldcities.csv")
        );
        assert!(
            DataSourceError::malformed("x.csv", "missing column `lat`")
                .to_string()
                .contains("missing column `lat`")
        );
    }

    #[test]
    fn test_user_messages() {
        let api_err = WeatherGridError::api("test");
        assert!(api_err.user_message().contains("Unable to connect"));

        let input_err = WeatherGridError::invalid_input("radius 600 km");
        assert!(input_err.user_message().contains("radius 600 km"));

        let data_err = WeatherGridError::from(DataSourceError::not_found("w.csv"));
        assert!(data_err.user_message().contains("w.csv"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: WeatherGridError = io_err.into();
        assert!(matches!(err, WeatherGridError::Io { .. }));
    }
}
