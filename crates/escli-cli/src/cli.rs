//! Process entry point: parses arguments, installs logging, dispatches to the
//! resolved command and maps its outcome to an exit status.

use std::ffi::OsString;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, FromArgMatches};
use escli_config::ConfigStore;
use escli_telemetry::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, TelemetryError, init_logging};
use reqwest::Url;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::builder::CommandContext;
use crate::client::{
    CURRENT_VERSION, ConnectOptions, DEFAULT_RELEASE_URL, DEFAULT_TIMEOUT_SECS, HttpConnector,
};
use crate::commands;
use crate::error::CliError;
use crate::executor::ExecutorFactory;
use crate::output::OutputStream;
use crate::tree::CommandTree;

/// Exit status used when no command was selected.
const EXIT_USAGE: i32 = 2;

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Configuration file (defaults to `$ESCLI_CONFIG` or `~/.escli/config.yaml`).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// HTTP timeout in seconds.
    #[arg(
        long,
        global = true,
        env = "ESCLI_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    timeout: u64,
    /// Log level or filter directive.
    #[arg(long, global = true, env = "ESCLI_LOG", default_value = DEFAULT_LOG_LEVEL)]
    log_level: String,
    /// Log output format: compact, pretty or json.
    #[arg(
        long,
        global = true,
        env = "ESCLI_LOG_FORMAT",
        default_value = "compact",
        value_parser = parse_log_format
    )]
    log_format: LogFormat,
    #[arg(
        long,
        global = true,
        hide = true,
        env = "ESCLI_RELEASE_URL",
        default_value = DEFAULT_RELEASE_URL,
        value_parser = parse_url
    )]
    release_url: Url,
}

fn parse_log_format(value: &str) -> Result<LogFormat, String> {
    value.parse().map_err(|err: TelemetryError| err.to_string())
}

fn parse_url(value: &str) -> Result<Url, String> {
    Url::parse(value).map_err(|err| err.to_string())
}

/// Full command line for `tree`, including the global flags.
pub(crate) fn command_line(tree: &CommandTree) -> clap::Command {
    GlobalArgs::augment_args(tree.to_clap())
}

/// Run escli against the process arguments and standard streams.
pub async fn run() -> i32 {
    let args: Vec<OsString> = std::env::args_os().collect();
    execute(args, OutputStream::stdout(), OutputStream::stderr()).await
}

/// Run escli with explicit arguments and output streams, returning the exit status.
pub async fn execute<I, T>(args: I, mut out: OutputStream, mut err: OutputStream) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let tree = match commands::root() {
        Ok(tree) => Arc::new(tree),
        Err(error) => return report(&mut err, &error),
    };

    let parsed = command_line(&tree)
        .try_get_matches_from(args)
        .and_then(|matches| Ok((GlobalArgs::from_arg_matches(&matches)?, matches)));
    let (globals, matches) = match parsed {
        Ok(parsed) => parsed,
        Err(error) => {
            let stream = if error.use_stderr() {
                &mut err
            } else {
                &mut out
            };
            let _ = write!(stream, "{}", error.render());
            return error.exit_code();
        }
    };

    install_logging(&globals);

    let Some((definition, args)) = tree
        .resolve(&matches)
        .map(|(definition, args)| (definition.clone(), args))
    else {
        let _ = command_line(&tree).write_help(&mut err);
        return EXIT_USAGE;
    };

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn(cancel_on_interrupt(cancel.clone()));

    let store = globals
        .config
        .map_or_else(ConfigStore::from_env, ConfigStore::new);
    debug!(path = %store.path().display(), "configuration store selected");
    let connector = HttpConnector::new(ConnectOptions::new(
        Duration::from_secs(globals.timeout),
        globals.release_url,
    ));
    let executors = ExecutorFactory::new(Arc::new(store.clone()), Arc::new(connector));
    let ctx = CommandContext::new(Arc::clone(&tree), executors, cancel)
        .with_args(args)
        .with_store(store);

    info!(command = definition.name(), "dispatching");
    let outcome = definition.invoke(ctx, out).await;
    interrupt.abort();

    match outcome {
        Ok(()) => 0,
        Err(error) => report(&mut err, &error),
    }
}

/// A rejected `--log-level` falls back to the default filter and is reported
/// through the installed subscriber, never on the command's error stream.
fn install_logging(globals: &GlobalArgs) {
    let config = LoggingConfig {
        level: &globals.log_level,
        format: globals.log_format,
        build_version: CURRENT_VERSION,
    };
    match init_logging(&config) {
        Ok(()) | Err(TelemetryError::SubscriberInstall { .. }) => {}
        Err(error) => {
            let _ = init_logging(&LoggingConfig {
                build_version: CURRENT_VERSION,
                ..LoggingConfig::default()
            });
            warn!(%error, level = %globals.log_level, "invalid log level, using default logging");
        }
    }
}

async fn cancel_on_interrupt(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_ok() {
        warn!("interrupt received, cancelling");
        cancel.cancel();
    }
}

fn report(err: &mut OutputStream, error: &CliError) -> i32 {
    debug!(kind = error.kind(), error = ?error, "command failed");
    let _ = writeln!(err, "error: {}", error.display_message());
    error.exit_code()
}
