//! # Error Types
//!
//! Custom error types for the sensor logger using `thiserror`.

use std::path::PathBuf;

use thiserror::Error;

use crate::sensors::SensorError;

/// Main error type for the sensor logger
#[derive(Debug, Error)]
pub enum LoggerError {
    /// Configuration errors (parse and validation)
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// The serial device node does not exist
    #[error("Serial port not found: {0}")]
    SerialPortNotFound(String),

    /// The session file could not be written durably
    #[error("Failed to write {path} after {rows_written} rows: {source}")]
    Sink {
        path: PathBuf,
        rows_written: u64,
        #[source]
        source: std::io::Error,
    },

    /// Sensor construction errors
    #[error("Sensor error: {0}")]
    Sensor(#[from] SensorError),
}

/// Result type alias for the sensor logger
pub type Result<T> = std::result::Result<T, LoggerError>;
