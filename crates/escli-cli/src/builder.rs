//! Declarative command definitions.
//!
//! A definition pairs a name and description with an arity policy and a
//! handler. The handler only describes what the command does; obtaining a
//! connected runner is delegated to the [`ExecutorFactory`] carried by the
//! [`CommandContext`], and reporting failures is left to the dispatch layer.
//!
//! ```ignore
//! let indices = CommandBuilder::new("indices")
//!     .with_description("_cat/indices")
//!     .no_args(cat_indices);
//! ```

use std::fmt::{self, Debug, Formatter};
use std::future::Future;
use std::sync::Arc;

use escli_config::ConfigStore;
use futures_util::future::BoxFuture;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::error::{CliError, CliResult};
use crate::executor::{Executor, ExecutorFactory};
use crate::output::OutputStream;
use crate::tree::CommandTree;

/// Future returned by a [`Handler`].
pub type HandlerFuture = BoxFuture<'static, CliResult<()>>;

/// Type-erased command handler.
pub type Handler = Arc<dyn Fn(CommandContext, OutputStream) -> HandlerFuture + Send + Sync>;

/// Per-invocation state handed to a handler.
#[derive(Clone)]
pub struct CommandContext {
    args: Vec<String>,
    cancel: CancellationToken,
    executors: ExecutorFactory,
    tree: Arc<CommandTree>,
    store: Option<ConfigStore>,
}

impl CommandContext {
    /// Context for a command registered in `tree`.
    #[must_use]
    pub const fn new(
        tree: Arc<CommandTree>,
        executors: ExecutorFactory,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            args: Vec::new(),
            cancel,
            executors,
            tree,
            store: None,
        }
    }

    /// Attach the positional arguments selected by dispatch.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Attach the writable configuration store backing this invocation.
    #[must_use]
    pub fn with_store(mut self, store: ConfigStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Positional arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Cancellation signal for this invocation.
    #[must_use]
    pub const fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Factory producing connected executors.
    #[must_use]
    pub const fn executors(&self) -> &ExecutorFactory {
        &self.executors
    }

    /// Root of the command tree this invocation was dispatched from.
    #[must_use]
    pub fn tree(&self) -> &CommandTree {
        &self.tree
    }

    /// Configuration store, when the invocation is backed by one.
    #[must_use]
    pub const fn store(&self) -> Option<&ConfigStore> {
        self.store.as_ref()
    }

    /// Run `use_runner` against a freshly built executor.
    ///
    /// # Errors
    ///
    /// See [`ExecutorFactory::run_executor`].
    pub async fn run_executor<F, Fut, T>(&self, use_runner: F) -> CliResult<T>
    where
        F: FnOnce(Executor) -> Fut,
        Fut: Future<Output = CliResult<T>>,
    {
        self.executors.run_executor(&self.cancel, use_runner).await
    }

    fn fresh(mut self) -> Self {
        self.cancel = self.cancel.child_token();
        self
    }
}

type ArgCheck = Arc<dyn Fn(&[String]) -> Result<(), String> + Send + Sync>;

/// Custom positional-argument check used by [`Arity::Variable`].
#[derive(Clone)]
pub struct ArgValidator {
    usage: String,
    value_name: String,
    check: ArgCheck,
}

impl ArgValidator {
    /// Validator described by `usage` in error messages.
    #[must_use]
    pub fn new(
        usage: impl Into<String>,
        value_name: impl Into<String>,
        check: impl Fn(&[String]) -> Result<(), String> + Send + Sync + 'static,
    ) -> Self {
        Self {
            usage: usage.into(),
            value_name: value_name.into(),
            check: Arc::new(check),
        }
    }

    /// Exactly one argument drawn from `choices`.
    #[must_use]
    pub fn one_of(value_name: &str, choices: &[&str]) -> Self {
        let allowed: Vec<String> = choices.iter().map(ToString::to_string).collect();
        let usage = format!("{value_name} (one of {})", allowed.join(", "));
        Self::new(usage, value_name, move |args| {
            if args.len() != 1 {
                return Err(format!("requires 1 arg, found {}", args.len()));
            }
            if allowed.iter().any(|choice| choice == &args[0]) {
                Ok(())
            } else {
                Err(format!("invalid argument \"{}\"", args[0]))
            }
        })
    }

    /// At least `min` arguments.
    #[must_use]
    pub fn at_least(min: usize, value_name: &str) -> Self {
        let plural = if min == 1 { "" } else { "s" };
        Self::new(
            format!("at least {min} argument{plural}"),
            value_name,
            move |args| {
                if args.len() >= min {
                    Ok(())
                } else {
                    Err(format!(
                        "requires at least {min} arg{plural}, found {}",
                        args.len()
                    ))
                }
            },
        )
    }

    /// Human-readable description of the accepted arguments.
    #[must_use]
    pub fn usage(&self) -> &str {
        &self.usage
    }
}

impl Debug for ArgValidator {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("ArgValidator")
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}

/// How many positional arguments a command accepts.
#[derive(Clone, Debug)]
pub enum Arity {
    /// No positional arguments.
    None,
    /// Exactly this many positional arguments.
    Exact(usize),
    /// Any arguments the validator accepts.
    Variable(ArgValidator),
}

impl Arity {
    /// Description used in usage errors.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::None => "no arguments".to_string(),
            Self::Exact(1) => "exactly 1 argument".to_string(),
            Self::Exact(count) => format!("exactly {count} arguments"),
            Self::Variable(validator) => validator.usage().to_string(),
        }
    }

    /// Placeholder shown in help output, if the command takes arguments.
    #[must_use]
    pub fn value_name(&self) -> Option<&str> {
        match self {
            Self::None => None,
            Self::Exact(_) => Some("ARGS"),
            Self::Variable(validator) => Some(&validator.value_name),
        }
    }

    /// Validate `args` for `command`.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Argument`] naming the expected arity when the
    /// arguments are rejected.
    pub fn check(&self, command: &str, args: &[String]) -> CliResult<()> {
        let reason = match self {
            Self::None if args.is_empty() => return Ok(()),
            Self::Exact(count) if args.len() == *count => return Ok(()),
            Self::None | Self::Exact(_) => None,
            Self::Variable(validator) => match (validator.check)(args) {
                Ok(()) => return Ok(()),
                Err(reason) => Some(reason),
            },
        };
        Err(CliError::Argument {
            command: command.to_string(),
            expected: self.describe(),
            found: args.len(),
            reason,
        })
    }
}

/// Fluent declaration of a single command.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    name: String,
    description: String,
}

impl CommandBuilder {
    /// Start a definition named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }

    /// Attach the human-readable description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Finish as a command accepting no positional arguments.
    #[must_use]
    pub fn no_args<F, Fut>(self, handler: F) -> CommandDefinition
    where
        F: Fn(CommandContext, OutputStream) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CliResult<()>> + Send + 'static,
    {
        self.finish(Arity::None, handler)
    }

    /// Finish as a command accepting exactly `count` positional arguments.
    #[must_use]
    pub fn exact_args<F, Fut>(self, count: usize, handler: F) -> CommandDefinition
    where
        F: Fn(CommandContext, OutputStream) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CliResult<()>> + Send + 'static,
    {
        self.finish(Arity::Exact(count), handler)
    }

    /// Finish as a command whose arguments are checked by `validator`.
    #[must_use]
    pub fn variable_args<F, Fut>(self, validator: ArgValidator, handler: F) -> CommandDefinition
    where
        F: Fn(CommandContext, OutputStream) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CliResult<()>> + Send + 'static,
    {
        self.finish(Arity::Variable(validator), handler)
    }

    fn finish<F, Fut>(self, arity: Arity, handler: F) -> CommandDefinition
    where
        F: Fn(CommandContext, OutputStream) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CliResult<()>> + Send + 'static,
    {
        let boxed = move |ctx: CommandContext, out: OutputStream| -> HandlerFuture {
            Box::pin(handler(ctx, out))
        };
        CommandDefinition {
            name: self.name,
            description: self.description,
            arity,
            handler: Arc::new(boxed),
        }
    }
}

/// A finished, immutable command.
#[derive(Clone)]
pub struct CommandDefinition {
    name: String,
    description: String,
    arity: Arity,
    handler: Handler,
}

impl CommandDefinition {
    /// Command name, unique among its siblings.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared arity policy.
    #[must_use]
    pub const fn arity(&self) -> &Arity {
        &self.arity
    }

    /// Check the arguments in `ctx` and, if they pass, run the handler with a
    /// child cancellation token.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Argument`] before the handler runs when the
    /// arguments are rejected, otherwise whatever the handler returns.
    pub async fn invoke(&self, ctx: CommandContext, out: OutputStream) -> CliResult<()> {
        self.arity.check(&self.name, ctx.args())?;
        let span = tracing::info_span!("command", name = %self.name);
        (self.handler)(ctx.fresh(), out).instrument(span).await
    }
}

impl Debug for CommandDefinition {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::executor::tests::{FakeConnector, factory_with, sample_config};
    use anyhow::anyhow;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn context(connector: Arc<FakeConnector>, args: &[&str]) -> CommandContext {
        CommandContext::new(
            Arc::new(CommandTree::new("escli")),
            factory_with(Some(sample_config()), connector),
            CancellationToken::new(),
        )
        .with_args(args.iter().map(ToString::to_string).collect())
    }

    async fn echo(ctx: CommandContext, mut out: OutputStream) -> CliResult<()> {
        writeln!(out, "{}", ctx.args().join(" ")).map_err(CliError::handler)
    }

    async fn wait_for_cancel(ctx: CommandContext, _out: OutputStream) -> CliResult<()> {
        ctx.cancel().cancelled().await;
        Err(CliError::Cancelled)
    }

    async fn touches_executor(ctx: CommandContext, _out: OutputStream) -> CliResult<()> {
        ctx.run_executor(|_executor| async { Ok(()) }).await
    }

    #[tokio::test]
    async fn no_args_rejects_arguments_before_any_executor() {
        let connector = Arc::new(FakeConnector::default());
        let definition = CommandBuilder::new("update").no_args(touches_executor);
        let (out, _captured) = OutputStream::buffer();

        let err = definition
            .invoke(context(Arc::clone(&connector), &["extra"]), out)
            .await
            .expect_err("arguments should be rejected");

        assert!(matches!(err, CliError::Argument { found: 1, .. }));
        assert!(err.display_message().contains("no arguments"));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn exact_args_accepts_only_the_declared_count() {
        let connector = Arc::new(FakeConnector::default());
        let definition = CommandBuilder::new("alias")
            .with_description("point an alias at an index")
            .exact_args(2, echo);

        let (out, captured) = OutputStream::buffer();
        definition
            .invoke(context(Arc::clone(&connector), &["logs-1", "logs"]), out)
            .await
            .expect("two arguments reach the handler");
        assert_eq!(captured.contents(), "logs-1 logs\n");

        for args in [&["logs-1"][..], &["a", "b", "c"][..]] {
            let (out, captured) = OutputStream::buffer();
            let err = definition
                .invoke(context(Arc::clone(&connector), args), out)
                .await
                .expect_err("wrong arity is rejected");
            assert!(err.display_message().contains("exactly 2 arguments"));
            assert!(captured.contents().is_empty());
        }
    }

    #[tokio::test]
    async fn variable_args_defers_to_the_validator() {
        let connector = Arc::new(FakeConnector::default());
        let definition = CommandBuilder::new("completion")
            .variable_args(ArgValidator::one_of("SHELL", &["bash", "zsh"]), echo);

        let (out, captured) = OutputStream::buffer();
        definition
            .invoke(context(Arc::clone(&connector), &["zsh"]), out)
            .await
            .expect("valid shell accepted");
        assert_eq!(captured.contents(), "zsh\n");

        let (out, _) = OutputStream::buffer();
        let err = definition
            .invoke(context(Arc::clone(&connector), &["tcsh"]), out)
            .await
            .expect_err("unknown shell rejected");
        match err {
            CliError::Argument {
                expected, reason, ..
            } => {
                assert_eq!(expected, "SHELL (one of bash, zsh)");
                assert_eq!(reason.as_deref(), Some("invalid argument \"tcsh\""));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn at_least_validator_counts_arguments() {
        let arity = Arity::Variable(ArgValidator::at_least(1, "INDEX"));
        assert!(arity.check("delete", &["a".to_string()]).is_ok());
        assert!(matches!(
            arity.check("delete", &[]),
            Err(CliError::Argument { found: 0, .. })
        ));
        assert_eq!(arity.value_name(), Some("INDEX"));
        assert_eq!(Arity::None.value_name(), None);
    }

    #[tokio::test]
    async fn handler_errors_propagate_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let definition = CommandBuilder::new("fail").no_args(move |_ctx, _out| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(CliError::handler(anyhow!("index not found"))) }
        });

        let (out, _) = OutputStream::buffer();
        let err = definition
            .invoke(context(Arc::new(FakeConnector::default()), &[]), out)
            .await
            .expect_err("handler failure surfaces");
        assert_eq!(err.display_message(), "HandlerError: index not found");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn building_twice_yields_equivalent_definitions() {
        let build = || {
            CommandBuilder::new("indices")
                .with_description("_cat/indices")
                .no_args(echo)
        };
        let first = build();
        let second = build();
        assert_eq!(first.name(), second.name());
        assert_eq!(first.description(), second.description());
        assert_eq!(first.arity().describe(), second.arity().describe());

        for definition in [first, second] {
            let (out, captured) = OutputStream::buffer();
            definition
                .invoke(context(Arc::new(FakeConnector::default()), &[]), out)
                .await
                .expect("invocation succeeds");
            assert_eq!(captured.contents(), "\n");
        }
    }

    #[tokio::test]
    async fn handlers_receive_a_child_cancellation_token() {
        let parent = CancellationToken::new();
        let definition = CommandBuilder::new("wait").no_args(wait_for_cancel);
        let ctx = CommandContext::new(
            Arc::new(CommandTree::new("escli")),
            factory_with(Some(sample_config()), Arc::new(FakeConnector::default())),
            parent.clone(),
        );
        parent.cancel();
        let (out, _) = OutputStream::buffer();
        let result = definition.invoke(ctx, out).await;
        assert!(matches!(result, Err(CliError::Cancelled)));
    }
}
