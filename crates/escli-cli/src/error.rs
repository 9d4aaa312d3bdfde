//! Error taxonomy shared by the dispatch layer, the executor factory and handlers.

use std::fmt::{self, Display, Formatter};

use escli_config::ConfigError;

/// Every failure a command invocation can end with.
#[derive(Debug)]
pub enum CliError {
    /// Persisted configuration is missing, unreadable or unrecognized.
    ConfigInvalid(ConfigError),
    /// The runner could not be constructed against the configured cluster.
    ConnectionFailed {
        /// Endpoint the connection was attempted against.
        endpoint: String,
        /// Underlying transport or handshake failure.
        source: anyhow::Error,
    },
    /// Positional arguments did not satisfy the command's arity policy.
    Argument {
        /// Command that rejected the arguments.
        command: String,
        /// Description of the accepted arity.
        expected: String,
        /// Number of arguments actually supplied.
        found: usize,
        /// Validator-specific explanation, when one was produced.
        reason: Option<String>,
    },
    /// The invocation was cancelled before it could finish.
    Cancelled,
    /// The operation itself failed.
    Handler(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Wrap an operation failure.
    pub fn handler(error: impl Into<anyhow::Error>) -> Self {
        Self::Handler(error.into())
    }

    /// Taxonomy name used in user-facing messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::ConfigInvalid(_) => "ConfigInvalid",
            Self::ConnectionFailed { .. } => "ConnectionFailed",
            Self::Argument { .. } => "ArgumentError",
            Self::Cancelled => "Cancelled",
            Self::Handler(_) => "HandlerError",
        }
    }

    /// Process exit status for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Handler(_) => 1,
            Self::Argument { .. } => 2,
            Self::ConfigInvalid(_) => 3,
            Self::ConnectionFailed { .. } => 4,
            Self::Cancelled => 130,
        }
    }

    /// Single-line message written to the error stream.
    #[must_use]
    pub fn display_message(&self) -> String {
        format!("{}: {}", self.kind(), self.detail())
    }

    fn detail(&self) -> String {
        match self {
            Self::ConfigInvalid(error) => error_chain(error),
            Self::ConnectionFailed { endpoint, source } => {
                format!("could not connect to {endpoint}: {source:#}")
            }
            Self::Argument {
                command,
                expected,
                found,
                reason,
            } => {
                let mut message = format!("'{command}' accepts {expected}, got {found}");
                if let Some(reason) = reason {
                    message.push_str(": ");
                    message.push_str(reason);
                }
                message
            }
            Self::Cancelled => "interrupted".to_string(),
            Self::Handler(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.display_message())
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConfigInvalid(error) => Some(error),
            Self::ConnectionFailed { source, .. } | Self::Handler(source) => Some(source.as_ref()),
            Self::Argument { .. } | Self::Cancelled => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(error: ConfigError) -> Self {
        Self::ConfigInvalid(error)
    }
}

fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
