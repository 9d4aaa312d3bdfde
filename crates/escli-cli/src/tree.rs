//! Hierarchical registry of command definitions and its clap rendering.

use clap::{Arg, ArgAction, ArgMatches};

use crate::builder::{Arity, CommandDefinition};
use crate::error::{CliError, CliResult};

const ARGS_ID: &str = "args";

/// A registered child of a [`CommandTree`].
#[derive(Debug, Clone)]
pub enum Node {
    /// Executable command.
    Leaf(CommandDefinition),
    /// Named group of further commands.
    Group(CommandTree),
}

impl Node {
    /// Name the node is addressed by on the command line.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Leaf(definition) => definition.name(),
            Self::Group(tree) => &tree.name,
        }
    }
}

/// A named group of commands and nested groups.
#[derive(Debug, Clone)]
pub struct CommandTree {
    name: String,
    description: String,
    version: Option<String>,
    nodes: Vec<Node>,
}

impl CommandTree {
    /// Empty tree named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            version: None,
            nodes: Vec::new(),
        }
    }

    /// Attach a description shown in help output.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Attach the version reported by `--version`.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Register a command.
    ///
    /// # Errors
    ///
    /// Fails when a sibling with the same name is already registered.
    pub fn command(self, definition: CommandDefinition) -> CliResult<Self> {
        self.push(Node::Leaf(definition))
    }

    /// Register a nested group.
    ///
    /// # Errors
    ///
    /// Fails when a sibling with the same name is already registered.
    pub fn group(self, group: Self) -> CliResult<Self> {
        self.push(Node::Group(group))
    }

    /// Name of this tree.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered children in registration order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Find the command addressed by `path`, e.g. `["cat", "indices"]`.
    #[must_use]
    pub fn lookup(&self, path: &[&str]) -> Option<&CommandDefinition> {
        let (head, rest) = path.split_first()?;
        match self.nodes.iter().find(|node| node.name() == *head)? {
            Node::Leaf(definition) if rest.is_empty() => Some(definition),
            Node::Leaf(_) => None,
            Node::Group(tree) => tree.lookup(rest),
        }
    }

    /// Render the tree as a clap command hierarchy.
    #[must_use]
    pub fn to_clap(&self) -> clap::Command {
        let mut command = clap::Command::new(self.name.clone()).about(self.description.clone());
        if let Some(version) = &self.version {
            command = command.version(version.clone());
        }
        for node in &self.nodes {
            command = command.subcommand(match node {
                Node::Leaf(definition) => leaf_command(definition),
                Node::Group(tree) => tree.to_clap().subcommand_required(true),
            });
        }
        command
    }

    /// Resolve parsed matches to a command and its positional arguments.
    ///
    /// Returns `None` when the matches stop at a group without selecting a command.
    #[must_use]
    pub fn resolve(&self, matches: &ArgMatches) -> Option<(&CommandDefinition, Vec<String>)> {
        let (name, sub_matches) = matches.subcommand()?;
        match self.nodes.iter().find(|node| node.name() == name)? {
            Node::Leaf(definition) => {
                let args = sub_matches
                    .get_many::<String>(ARGS_ID)
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default();
                Some((definition, args))
            }
            Node::Group(tree) => tree.resolve(sub_matches),
        }
    }

    fn push(mut self, node: Node) -> CliResult<Self> {
        if self.nodes.iter().any(|existing| existing.name() == node.name()) {
            return Err(CliError::handler(anyhow::anyhow!(
                "command '{}' is already registered under '{}'",
                node.name(),
                self.name
            )));
        }
        self.nodes.push(node);
        Ok(self)
    }
}

fn leaf_command(definition: &CommandDefinition) -> clap::Command {
    let arity = definition.arity();
    let args = Arg::new(ARGS_ID)
        .value_name(arity.value_name().unwrap_or("ARGS").to_string())
        .num_args(0..)
        .action(ArgAction::Append)
        .hide(matches!(arity, Arity::None));
    clap::Command::new(definition.name().to_string())
        .about(definition.description().to_string())
        .arg(args)
}
