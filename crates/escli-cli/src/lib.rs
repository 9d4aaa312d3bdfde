#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]
#![allow(clippy::redundant_pub_crate)]

//! Administrative command-line client for Elasticsearch clusters.
//!
//! Layout:
//! - `builder.rs`: declarative command definitions and arity policies
//! - `tree.rs`: command registry rendered to clap
//! - `executor.rs`: executor factory scoping one runner per invocation
//! - `client.rs`: HTTP connector and cluster runner
//! - `cli.rs`: argument parsing, dispatch and exit-status mapping
//! - `commands/`: built-in command handlers
//! - `main.rs`: thin entrypoint delegating to `run()`

pub mod builder;
pub(crate) mod cli;
pub mod client;
pub(crate) mod commands;
pub mod error;
pub mod executor;
pub mod output;
pub mod tree;

pub use builder::{ArgValidator, Arity, CommandBuilder, CommandContext, CommandDefinition};
pub use cli::{execute, run};
pub use error::{CliError, CliResult};
pub use executor::{Executor, ExecutorFactory, Runner, until_cancelled};
pub use output::OutputStream;
pub use tree::CommandTree;
