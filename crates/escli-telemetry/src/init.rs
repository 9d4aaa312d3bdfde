//! Logging initialisation primitives and logging configuration.
//!
//! # Design
//! - One entry point installs the global subscriber; logs always go to stderr
//!   so command output on stdout stays machine-readable.
//! - `RUST_LOG` takes precedence over the configured level.

use std::io;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{Result, TelemetryError};

/// Default logging level when neither `RUST_LOG` nor a flag is provided.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

static BUILD_VERSION: OnceCell<String> = OnceCell::new();

/// Configure and install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the level cannot be parsed or the subscriber cannot be
/// installed (for example, because another subscriber is already set).
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    BUILD_VERSION
        .set(config.build_version.to_string())
        .ok()
        .or(Some(()));

    let filter = build_env_filter(config.level)?;
    let installed = match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_writer(io::stderr)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .pretty()
                    .with_writer(io::stderr)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_writer(io::stderr)
                    .with_target(false),
            )
            .try_init(),
    };
    installed.map_err(|source| TelemetryError::SubscriberInstall { source })?;

    tracing::debug!(version = build_version(), "logging initialised");
    Ok(())
}

/// Version recorded during logging initialisation.
#[must_use]
pub fn build_version() -> &'static str {
    BUILD_VERSION.get().map_or("dev", String::as_str)
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Level or filter directive (e.g. `warn`, `escli_cli=debug`).
    pub level: &'a str,
    /// Output format selection for the tracing subscriber.
    pub format: LogFormat,
    /// Version string recorded for diagnostics.
    pub build_version: &'a str,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::default(),
            build_version: build_version(),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Emit logs as structured JSON objects.
    Json,
    /// Emit human-readable, multi-line logs.
    Pretty,
    /// Emit single-line human-readable logs.
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = TelemetryError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            _ => Err(TelemetryError::UnknownFormat {
                value: value.to_string(),
            }),
        }
    }
}

fn build_env_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level).map_err(|source| TelemetryError::InvalidLevel {
        value: level.to_string(),
        source,
    })
}
