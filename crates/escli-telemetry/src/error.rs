//! Error types for telemetry operations.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised by telemetry helpers.
#[derive(Debug)]
pub enum TelemetryError {
    /// Installing the tracing subscriber failed.
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: tracing_subscriber::util::TryInitError,
    },
    /// The requested log level or filter directive could not be parsed.
    InvalidLevel {
        /// Directive supplied by the caller.
        value: String,
        /// Underlying filter parse error.
        source: tracing_subscriber::filter::ParseError,
    },
    /// The requested log format is not supported.
    UnknownFormat {
        /// Format name supplied by the caller.
        value: String,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubscriberInstall { .. } => {
                formatter.write_str("failed to install tracing subscriber")
            }
            Self::InvalidLevel { value, .. } => write!(formatter, "invalid log level '{value}'"),
            Self::UnknownFormat { value } => {
                write!(formatter, "unknown log format '{value}' (expected json, pretty or compact)")
            }
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::SubscriberInstall { source } => Some(source),
            Self::InvalidLevel { source, .. } => Some(source),
            Self::UnknownFormat { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::util::SubscriberInitExt;

    fn try_init_error()
    -> std::result::Result<tracing_subscriber::util::TryInitError, Box<dyn Error>> {
        match tracing_subscriber::registry().try_init() {
            Ok(()) => match tracing_subscriber::registry().try_init() {
                Ok(()) => Err(io::Error::other("expected init error").into()),
                Err(err) => Ok(err),
            },
            Err(err) => Ok(err),
        }
    }

    #[test]
    fn telemetry_error_display_and_source() -> std::result::Result<(), Box<dyn Error>> {
        let init_error = try_init_error()?;
        let parse_error = EnvFilter::try_new("escli=loud")
            .err()
            .ok_or_else(|| io::Error::other("expected filter parse error"))?;

        let install = TelemetryError::SubscriberInstall { source: init_error };
        assert_eq!(install.to_string(), "failed to install tracing subscriber");
        assert!(install.source().is_some());

        let level = TelemetryError::InvalidLevel {
            value: "escli=loud".to_string(),
            source: parse_error,
        };
        assert_eq!(level.to_string(), "invalid log level 'escli=loud'");
        assert!(level.source().is_some());

        let format = TelemetryError::UnknownFormat {
            value: "xml".to_string(),
        };
        assert!(format.to_string().contains("'xml'"));
        assert!(format.source().is_none());
        Ok(())
    }
}
