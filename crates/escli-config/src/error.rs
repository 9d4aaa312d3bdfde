//! Error types for configuration operations.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file exists at the resolved location.
    #[error("no configuration found at {}", path.display())]
    Missing {
        /// Location that was checked.
        path: PathBuf,
    },
    /// File system operation failed.
    #[error("failed to {operation} {}", path.display())]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the operation.
        path: PathBuf,
        /// Source IO error.
        source: io::Error,
    },
    /// The document was not valid YAML or did not match the selected schema.
    #[error("configuration is malformed")]
    Parse {
        /// Source YAML error.
        source: serde_yaml::Error,
    },
    /// The document parsed but its top level is not a mapping.
    #[error("configuration must be a mapping of keys to values")]
    NotAMapping,
    /// The document matched neither the current nor a legacy schema.
    #[error("unrecognized configuration shape: {reason}")]
    UnrecognizedShape {
        /// Human-readable explanation of the mismatch.
        reason: String,
    },
    /// The document carried a version discriminator this build does not know.
    #[error("unsupported configuration version {version}")]
    UnsupportedVersion {
        /// Version number found in the document.
        version: u64,
    },
    /// Field contained an invalid value.
    #[error("invalid value for '{field}': {reason}")]
    InvalidField {
        /// Field that failed validation.
        field: &'static str,
        /// Offending value.
        value: String,
        /// Machine-readable reason for the failure.
        reason: &'static str,
    },
    /// Serialising the configuration for write-back failed.
    #[error("failed to serialize configuration")]
    Serialize {
        /// Source YAML error.
        source: serde_yaml::Error,
    },
}

/// Convenience result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
