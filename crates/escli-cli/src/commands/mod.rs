//! Built-in escli commands.

mod cat;
mod completion;
mod config;
mod update;

use crate::client::CURRENT_VERSION;
use crate::error::CliResult;
use crate::tree::CommandTree;

/// Assemble the full escli command tree.
pub(crate) fn root() -> CliResult<CommandTree> {
    CommandTree::new("escli")
        .with_description("Administrative command-line client for Elasticsearch clusters")
        .with_version(CURRENT_VERSION)
        .group(cat::group()?)?
        .command(update::command())?
        .group(config::group()?)?
        .command(completion::command())
}
