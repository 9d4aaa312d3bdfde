//! Inspecting and upgrading the persisted configuration.

use std::io::Write;

use anyhow::anyhow;
use escli_config::ConfigVersion;
use tracing::info;

use crate::builder::{CommandBuilder, CommandContext};
use crate::error::{CliError, CliResult};
use crate::output::OutputStream;
use crate::tree::CommandTree;

pub(crate) fn group() -> CliResult<CommandTree> {
    CommandTree::new("config")
        .with_description("inspect or upgrade the configuration file")
        .command(
            CommandBuilder::new("show")
                .with_description("print the resolved configuration")
                .no_args(show),
        )?
        .command(
            CommandBuilder::new("migrate")
                .with_description("rewrite the configuration file in the current format")
                .no_args(migrate),
        )
}

async fn show(ctx: CommandContext, mut out: OutputStream) -> CliResult<()> {
    let config = ctx.executors().load_config()?;
    out.write_all(config.render_yaml()?.as_bytes())
        .map_err(CliError::handler)
}

async fn migrate(ctx: CommandContext, mut out: OutputStream) -> CliResult<()> {
    let Some(store) = ctx.store() else {
        return Err(CliError::handler(anyhow!(
            "no configuration file is associated with this run"
        )));
    };
    let document = store.load_document()?;
    let from = document.version();
    store.save(&document.into_current())?;

    let to = ConfigVersion::CURRENT;
    info!(
        path = %store.path().display(),
        from = from.as_u64(),
        to = to.as_u64(),
        "configuration migrated"
    );
    writeln!(
        out,
        "{}: version {} -> version {}",
        store.path().display(),
        from.as_u64(),
        to.as_u64()
    )
    .map_err(CliError::handler)
}
