//! `_cat` listings.

use crate::builder::{CommandBuilder, CommandContext};
use crate::error::CliResult;
use crate::executor::until_cancelled;
use crate::output::OutputStream;
use crate::tree::CommandTree;

pub(crate) fn group() -> CliResult<CommandTree> {
    CommandTree::new("cat")
        .with_description("compact, column-aligned cluster listings")
        .command(
            CommandBuilder::new("indices")
                .with_description("_cat/indices")
                .no_args(indices),
        )?
        .command(
            CommandBuilder::new("nodes")
                .with_description("_cat/nodes")
                .no_args(nodes),
        )?
        .command(
            CommandBuilder::new("health")
                .with_description("_cat/health")
                .no_args(health),
        )
}

async fn indices(ctx: CommandContext, mut out: OutputStream) -> CliResult<()> {
    let cancel = ctx.cancel().clone();
    ctx.run_executor(|executor| async move {
        until_cancelled(&cancel, executor.runner().cat_indices(&mut out)).await
    })
    .await
}

async fn nodes(ctx: CommandContext, mut out: OutputStream) -> CliResult<()> {
    let cancel = ctx.cancel().clone();
    ctx.run_executor(|executor| async move {
        until_cancelled(&cancel, executor.runner().cat_nodes(&mut out)).await
    })
    .await
}

async fn health(ctx: CommandContext, mut out: OutputStream) -> CliResult<()> {
    let cancel = ctx.cancel().clone();
    ctx.run_executor(|executor| async move {
        until_cancelled(&cancel, executor.runner().cat_health(&mut out)).await
    })
    .await
}
