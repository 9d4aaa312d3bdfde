//! Release check.

use crate::builder::{CommandBuilder, CommandContext, CommandDefinition};
use crate::error::CliResult;
use crate::executor::until_cancelled;
use crate::output::OutputStream;

pub(crate) fn command() -> CommandDefinition {
    CommandBuilder::new("update")
        .with_description("check for a newer escli release")
        .no_args(update)
}

async fn update(ctx: CommandContext, mut out: OutputStream) -> CliResult<()> {
    let cancel = ctx.cancel().clone();
    ctx.run_executor(|executor| async move {
        tracing::debug!(profile = %executor.config().profile, "checking for updates");
        until_cancelled(&cancel, executor.runner().update(&mut out)).await
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::tests::context;
    use crate::error::CliError;
    use crate::executor::tests::FakeConnector;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn update_reports_through_the_runner() -> anyhow::Result<()> {
        let connector = Arc::new(FakeConnector::default());
        let (out, captured) = OutputStream::buffer();
        command()
            .invoke(context(Arc::clone(&connector), &[]), out)
            .await?;
        assert_eq!(captured.contents(), "escli is up to date\n");
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(connector.closed.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_cluster_is_a_connection_failure() {
        let connector = Arc::new(FakeConnector {
            fail: true,
            ..FakeConnector::default()
        });
        let (out, captured) = OutputStream::buffer();
        let result = command().invoke(context(connector, &[]), out).await;
        assert!(matches!(result, Err(CliError::ConnectionFailed { .. })));
        assert!(captured.contents().is_empty());
    }
}
