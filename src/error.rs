//! # Error Types
//!
//! Custom error types for the SERVO42D driver using `thiserror`.

use thiserror::Error;

/// Main error type for the SERVO42D driver
#[derive(Debug, Error)]
pub enum ServoError {
    /// Caller-supplied parameter out of range, raised before any I/O
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport failure, or a read that received nothing before the timeout
    #[error("Communication error: {context}")]
    Communication {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Response received but its structure, CRC or echo does not match
    #[error("Protocol mismatch: {0}")]
    ProtocolMismatch(String),

    /// Operation needs a cached value that has not been populated yet
    #[error("Missing cached configuration value: {0}")]
    ConfigurationDependency(&'static str),

    /// Serial port could not be opened
    #[error("Serial port error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No serial device found (tried: {0})")]
    SerialPortNotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServoError {
    /// Wrap a transport error with a short description of what was being done
    pub fn communication(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Communication {
            context: context.into(),
            source,
        }
    }
}

/// Result type alias for the SERVO42D driver
pub type Result<T> = std::result::Result<T, ServoError>;
