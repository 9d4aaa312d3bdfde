//! Shell completion scripts.

use std::io::Write;

use anyhow::anyhow;
use clap_complete::Shell;

use crate::builder::{ArgValidator, CommandBuilder, CommandContext, CommandDefinition};
use crate::cli::command_line;
use crate::error::{CliError, CliResult};
use crate::output::OutputStream;

const SHELLS: [&str; 3] = ["bash", "zsh", "fish"];

pub(crate) fn command() -> CommandDefinition {
    CommandBuilder::new("completion")
        .with_description("output shell completion for bash, zsh or fish")
        .variable_args(ArgValidator::one_of("SHELL", &SHELLS), completion)
}

async fn completion(ctx: CommandContext, mut out: OutputStream) -> CliResult<()> {
    let [shell] = ctx.args() else {
        return Err(CliError::handler(anyhow!("expected a single shell name")));
    };
    let shell: Shell = shell
        .parse()
        .map_err(|reason: String| CliError::handler(anyhow!(reason)))?;

    let mut command = command_line(ctx.tree());
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut out);
    out.flush().map_err(CliError::handler)
}
