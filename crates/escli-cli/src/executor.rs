//! Executor factory: resolves configuration, connects a runner and scopes its lifetime.
//!
//! # Design
//! - `run_executor` builds exactly one runner per call and always closes it
//!   after the caller's closure returns, whatever the outcome.
//! - Cancellation is honoured up to and including the connect handshake;
//!   afterwards handlers observe it themselves via [`until_cancelled`].

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use escli_config::{Config, ConfigLoader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{CliError, CliResult};

/// Identity reported by the cluster during the connect handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    /// Cluster name.
    pub name: String,
    /// Search engine version number.
    pub version: String,
}

/// Live, connected runtime a command handler operates against.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Cluster identity captured while connecting.
    fn cluster(&self) -> &ClusterInfo;
    /// Write the `_cat/indices` listing.
    async fn cat_indices(&self, out: &mut (dyn Write + Send)) -> anyhow::Result<()>;
    /// Write the `_cat/nodes` listing.
    async fn cat_nodes(&self, out: &mut (dyn Write + Send)) -> anyhow::Result<()>;
    /// Write the `_cat/health` summary.
    async fn cat_health(&self, out: &mut (dyn Write + Send)) -> anyhow::Result<()>;
    /// Check for a newer escli release and report the outcome.
    async fn update(&self, out: &mut (dyn Write + Send)) -> anyhow::Result<()>;
    /// Called once after the handler finishes, whatever its outcome.
    ///
    /// Transport resources such as pooled connections belong to the runner
    /// value itself and are freed when [`ExecutorFactory::run_executor`]
    /// drops it.
    async fn close(&self);
}

/// Builds runners from resolved configuration.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to the cluster described by `config`.
    async fn connect(&self, config: &Config) -> anyhow::Result<Arc<dyn Runner>>;
}

/// Runner plus the per-invocation state produced alongside it.
#[derive(Clone)]
pub struct Executor {
    runner: Arc<dyn Runner>,
    config: Config,
}

impl Executor {
    /// The connected runner.
    #[must_use]
    pub fn runner(&self) -> &dyn Runner {
        self.runner.as_ref()
    }

    /// Configuration resolved for this invocation.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

/// Produces one [`Executor`] per call from the current configuration.
#[derive(Clone)]
pub struct ExecutorFactory {
    loader: Arc<dyn ConfigLoader>,
    connector: Arc<dyn Connector>,
}

impl ExecutorFactory {
    /// Factory resolving configuration through `loader` and connecting with `connector`.
    #[must_use]
    pub fn new(loader: Arc<dyn ConfigLoader>, connector: Arc<dyn Connector>) -> Self {
        Self { loader, connector }
    }

    /// Load and validate configuration without connecting.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::ConfigInvalid`] when the configuration cannot be
    /// loaded or is unusable.
    pub fn load_config(&self) -> CliResult<Config> {
        let config = self.loader.load()?;
        config.validate()?;
        Ok(config)
    }

    /// Build an executor, hand it to `use_runner`, then release it.
    ///
    /// # Errors
    ///
    /// Returns [`CliError::Cancelled`] if `cancel` fires before the runner is
    /// connected, [`CliError::ConfigInvalid`] or [`CliError::ConnectionFailed`]
    /// when the runner cannot be built, and otherwise whatever `use_runner`
    /// returns.
    pub async fn run_executor<F, Fut, T>(
        &self,
        cancel: &CancellationToken,
        use_runner: F,
    ) -> CliResult<T>
    where
        F: FnOnce(Executor) -> Fut,
        Fut: Future<Output = CliResult<T>>,
    {
        if cancel.is_cancelled() {
            return Err(CliError::Cancelled);
        }

        let config = self.load_config()?;
        let runner = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(
                    endpoint = %config.elasticsearch_url,
                    "connect abandoned after cancellation"
                );
                return Err(CliError::Cancelled);
            }
            connected = self.connector.connect(&config) => {
                connected.map_err(|source| CliError::ConnectionFailed {
                    endpoint: config.elasticsearch_url.clone(),
                    source,
                })?
            }
        };
        info!(
            cluster = %runner.cluster().name,
            version = %runner.cluster().version,
            "runner ready"
        );

        let executor = Executor {
            runner: Arc::clone(&runner),
            config,
        };
        let result = use_runner(executor).await;
        runner.close().await;
        result
    }
}

/// Await `operation` unless `cancel` fires first.
///
/// # Errors
///
/// Returns [`CliError::Cancelled`] on cancellation and wraps operation
/// failures as [`CliError::Handler`].
pub async fn until_cancelled<T>(
    cancel: &CancellationToken,
    operation: impl Future<Output = anyhow::Result<T>>,
) -> CliResult<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(CliError::Cancelled),
        outcome = operation => outcome.map_err(CliError::Handler),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::anyhow;
    use escli_config::{ConfigError, ConfigResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    pub(crate) struct StaticLoader(pub(crate) Option<Config>);

    impl ConfigLoader for StaticLoader {
        fn load(&self) -> ConfigResult<Config> {
            self.0.clone().ok_or(ConfigError::UnrecognizedShape {
                reason: "test loader has no configuration".to_string(),
            })
        }
    }

    pub(crate) fn sample_config() -> Config {
        Config {
            profile: "test".to_string(),
            elasticsearch_url: "http://127.0.0.1:9200".to_string(),
            aws_region: "us-east-1".to_string(),
        }
    }

    pub(crate) struct FakeRunner {
        cluster: ClusterInfo,
        closed: Arc<AtomicUsize>,
        dropped: Arc<AtomicUsize>,
    }

    impl Drop for FakeRunner {
        fn drop(&mut self) {
            self.dropped.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl Runner for FakeRunner {
        fn cluster(&self) -> &ClusterInfo {
            &self.cluster
        }

        async fn cat_indices(&self, out: &mut (dyn Write + Send)) -> anyhow::Result<()> {
            writeln!(out, "green open logs-1")?;
            Ok(())
        }

        async fn cat_nodes(&self, out: &mut (dyn Write + Send)) -> anyhow::Result<()> {
            writeln!(out, "node-1")?;
            Ok(())
        }

        async fn cat_health(&self, out: &mut (dyn Write + Send)) -> anyhow::Result<()> {
            writeln!(out, "green")?;
            Ok(())
        }

        async fn update(&self, out: &mut (dyn Write + Send)) -> anyhow::Result<()> {
            writeln!(out, "escli is up to date")?;
            Ok(())
        }

        async fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Connector double recording every attempt.
    #[derive(Default)]
    pub(crate) struct FakeConnector {
        pub(crate) attempts: AtomicUsize,
        pub(crate) closed: Arc<AtomicUsize>,
        pub(crate) dropped: Arc<AtomicUsize>,
        pub(crate) fail: bool,
        pub(crate) hang: bool,
    }

    #[async_trait]
    impl Connector for FakeConnector {
        async fn connect(&self, _config: &Config) -> anyhow::Result<Arc<dyn Runner>> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.fail {
                return Err(anyhow!("connection refused"));
            }
            Ok(Arc::new(FakeRunner {
                cluster: ClusterInfo {
                    name: "test-cluster".to_string(),
                    version: "7.10.2".to_string(),
                },
                closed: Arc::clone(&self.closed),
                dropped: Arc::clone(&self.dropped),
            }))
        }
    }

    pub(crate) fn factory_with(
        config: Option<Config>,
        connector: Arc<FakeConnector>,
    ) -> ExecutorFactory {
        ExecutorFactory::new(Arc::new(StaticLoader(config)), connector)
    }

    #[tokio::test]
    async fn runs_closure_and_releases_runner() -> anyhow::Result<()> {
        let connector = Arc::new(FakeConnector::default());
        let factory = factory_with(Some(sample_config()), Arc::clone(&connector));

        let cluster = factory
            .run_executor(&CancellationToken::new(), |executor| async move {
                assert_eq!(executor.config().profile, "test");
                Ok(executor.runner().cluster().name.clone())
            })
            .await?;

        assert_eq!(cluster, "test-cluster");
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
        assert_eq!(connector.dropped.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn releases_runner_when_handler_fails() {
        let connector = Arc::new(FakeConnector::default());
        let factory = factory_with(Some(sample_config()), Arc::clone(&connector));

        let result: CliResult<()> = factory
            .run_executor(&CancellationToken::new(), |_executor| async {
                Err(CliError::handler(anyhow!("index not found")))
            })
            .await;

        assert!(matches!(result, Err(CliError::Handler(_))));
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_configuration_never_connects() {
        let connector = Arc::new(FakeConnector::default());
        let factory = factory_with(None, Arc::clone(&connector));

        let result = factory
            .run_executor(&CancellationToken::new(), |_executor| async { Ok(()) })
            .await;
        assert!(matches!(result, Err(CliError::ConfigInvalid(_))));

        let unusable = Config {
            elasticsearch_url: String::new(),
            ..sample_config()
        };
        let factory = factory_with(Some(unusable), Arc::clone(&connector));
        let result = factory
            .run_executor(&CancellationToken::new(), |_executor| async { Ok(()) })
            .await;
        assert!(matches!(result, Err(CliError::ConfigInvalid(_))));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn connect_failure_is_reported_with_endpoint() {
        let connector = Arc::new(FakeConnector {
            fail: true,
            ..FakeConnector::default()
        });
        let factory = factory_with(Some(sample_config()), Arc::clone(&connector));

        let err = factory
            .run_executor(&CancellationToken::new(), |_executor| async { Ok(()) })
            .await
            .expect_err("connect should fail");
        match err {
            CliError::ConnectionFailed { endpoint, .. } => {
                assert_eq!(endpoint, "http://127.0.0.1:9200");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(connector.closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_before_connect_yields_cancelled() {
        let connector = Arc::new(FakeConnector::default());
        let factory = factory_with(Some(sample_config()), Arc::clone(&connector));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = factory
            .run_executor(&cancel, |_executor| async { Ok(()) })
            .await;
        assert!(matches!(result, Err(CliError::Cancelled)));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelled_during_connect_yields_cancelled() {
        let connector = Arc::new(FakeConnector {
            hang: true,
            ..FakeConnector::default()
        });
        let factory = factory_with(Some(sample_config()), Arc::clone(&connector));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            factory.run_executor(&cancel, |_executor| async { Ok(()) }),
        )
        .await
        .expect("cancellation should end the connect attempt");
        assert!(matches!(result, Err(CliError::Cancelled)));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelled_while_handler_runs_still_releases_runner() {
        let connector = Arc::new(FakeConnector::default());
        let factory = factory_with(Some(sample_config()), Arc::clone(&connector));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let stalled = factory.run_executor(&cancel, |_executor| {
            until_cancelled(&cancel, std::future::pending::<anyhow::Result<()>>())
        });
        let result = tokio::time::timeout(Duration::from_secs(5), stalled)
            .await
            .expect("cancellation should end the handler");

        assert!(matches!(result, Err(CliError::Cancelled)));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
        assert_eq!(connector.dropped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn until_cancelled_prefers_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = until_cancelled(&cancel, std::future::pending::<anyhow::Result<()>>()).await;
        assert!(matches!(result, Err(CliError::Cancelled)));

        let live = CancellationToken::new();
        let value = until_cancelled(&live, async { Ok(7) }).await;
        assert!(matches!(value, Ok(7)));
    }
}
