//! Command registry
//!
//! Commands register against a namespace with a clap command (name, aliases,
//! help, flags) and a handler implementing [`Command`]. The registry keeps the
//! tree, renders it into one `clap::Command` for parsing, and maps the matched
//! subcommand path back to its handler.

use std::fmt::Display;
use std::io::BufRead;
use std::str::FromStr;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::ArgMatches;

use crate::api::ApiClient;
use crate::cli::error::{CliError, CliResult};
use crate::cli::output::SyncWriter;
use crate::config::{File, Settings};
use crate::infrastructure::di::ServiceContainer;
use crate::manifest::ManifestData;
use crate::optional::{Optional, ParseError};

/// Name and configuration shared by every command.
#[derive(Debug, Clone)]
pub struct Base {
    name: &'static str,
    config: Arc<Settings>,
}

impl Base {
    pub fn new(name: &'static str, config: Arc<Settings>) -> Self {
        Self { name, config }
    }
}

/// Access to the embedded [`Base`].
pub trait HasBase {
    fn base(&self) -> &Base;
}

pub trait HasName {
    fn name(&self) -> &str;
}

pub trait HasConfig {
    fn config(&self) -> &Settings;
}

impl<T: HasBase> HasName for T {
    fn name(&self) -> &str {
        self.base().name
    }
}

impl<T: HasBase> HasConfig for T {
    fn config(&self) -> &Settings {
        &self.base().config
    }
}

/// Flags accepted by every command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalFlags {
    pub token: Option<String>,
    pub endpoint: Option<String>,
    pub verbose: bool,
}

impl GlobalFlags {
    pub fn args() -> [clap::Arg; 3] {
        [
            clap::Arg::new("token")
                .short('t')
                .long("token")
                .global(true)
                .help("Fastly API token (or via FASTLY_API_TOKEN)"),
            clap::Arg::new("endpoint")
                .long("endpoint")
                .global(true)
                .help("Fastly API endpoint"),
            clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(clap::ArgAction::SetTrue)
                .help("Verbose logging"),
        ]
    }

    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            token: matches.get_one::<String>("token").cloned(),
            endpoint: matches.get_one::<String>("endpoint").cloned(),
            verbose: matches.get_flag("verbose"),
        }
    }
}

/// Dependencies handed to a command's `exec`.
pub struct ExecContext<'a> {
    /// Present only for commands that declare `requires_client`.
    pub client: Option<Box<dyn ApiClient>>,
    pub manifest: ManifestData,
    pub flags: GlobalFlags,
    /// Config file record as read at startup (empty when absent).
    pub file: &'a File,
    pub container: &'a ServiceContainer,
    /// The full command tree, for introspection (completions).
    pub cli: &'a clap::Command,
}

impl ExecContext<'_> {
    pub fn client(&self) -> CliResult<&dyn ApiClient> {
        self.client
            .as_deref()
            .ok_or_else(|| CliError::config("API client was not constructed for this command"))
    }
}

/// Execution contract every registered command satisfies.
pub trait Command: HasName + HasConfig {
    /// Copy parsed flag values into the command's fields.
    fn bind(&mut self, matches: &ArgMatches) -> CliResult<()>;

    /// Whether the dispatcher must build an API client before `exec`.
    fn requires_client(&self) -> bool {
        true
    }

    fn exec(
        &mut self,
        ctx: &ExecContext<'_>,
        input: &mut dyn BufRead,
        out: &mut SyncWriter,
    ) -> CliResult<()>;
}

struct Node {
    spec: clap::Command,
    children: Vec<usize>,
    handler: Option<usize>,
}

/// Outcome of parsing the argument vector.
pub enum Parsed {
    Matched { handler: usize, matches: ArgMatches },
    /// Help or version text requested; nothing to execute.
    Rendered(String),
}

/// Tree of namespaces and commands.
pub struct Registry {
    root: clap::Command,
    nodes: Vec<Node>,
    top: Vec<usize>,
    handlers: Vec<Box<dyn Command>>,
}

/// Registration surface for one level of the tree.
pub struct Namespace<'r> {
    registry: &'r mut Registry,
    parent: Option<usize>,
}

impl Namespace<'_> {
    /// Add a nested namespace (e.g. `logshuttle`) and return it.
    pub fn namespace(&mut self, spec: clap::Command) -> Namespace<'_> {
        let index = self.add(spec, None);
        Namespace {
            registry: &mut *self.registry,
            parent: Some(index),
        }
    }

    /// Register a leaf command.
    pub fn command(&mut self, spec: clap::Command, handler: Box<dyn Command>) {
        let handler_index = self.registry.handlers.len();
        self.registry.handlers.push(handler);
        self.add(spec, Some(handler_index));
    }

    fn add(&mut self, spec: clap::Command, handler: Option<usize>) -> usize {
        let index = self.registry.nodes.len();
        self.registry.nodes.push(Node {
            spec,
            children: Vec::new(),
            handler,
        });
        match self.parent {
            Some(parent) => self.registry.nodes[parent].children.push(index),
            None => self.registry.top.push(index),
        }
        index
    }
}

impl Registry {
    pub fn new(root: clap::Command) -> Self {
        Self {
            root,
            nodes: Vec::new(),
            top: Vec::new(),
            handlers: Vec::new(),
        }
    }

    pub fn root(&mut self) -> Namespace<'_> {
        Namespace {
            registry: self,
            parent: None,
        }
    }

    /// Render the whole tree as a clap command.
    pub fn to_clap(&self) -> clap::Command {
        self.top
            .iter()
            .fold(self.root.clone(), |cmd, &i| cmd.subcommand(self.build(i)))
            .subcommand_required(true)
            .arg_required_else_help(true)
    }

    fn build(&self, index: usize) -> clap::Command {
        let node = &self.nodes[index];
        let cmd = node
            .children
            .iter()
            .fold(node.spec.clone(), |cmd, &i| cmd.subcommand(self.build(i)));
        if node.children.is_empty() {
            cmd
        } else {
            cmd.subcommand_required(true)
        }
    }

    /// Parse `args` (without the program name) against `cli`.
    ///
    /// `cli` must come from [`Registry::to_clap`] on this registry.
    pub fn parse(&self, cli: &clap::Command, args: &[String]) -> CliResult<Parsed> {
        let argv = std::iter::once(cli.get_name().to_string()).chain(args.iter().cloned());
        let matches = match cli.clone().try_get_matches_from(argv) {
            Ok(matches) => matches,
            Err(e) => {
                return match e.kind() {
                    ErrorKind::DisplayHelp
                    | ErrorKind::DisplayVersion
                    | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                        Ok(Parsed::Rendered(e.render().to_string()))
                    }
                    _ => Err(CliError::Parse(e)),
                }
            }
        };

        match self.locate(&matches) {
            Some((handler, matches)) => Ok(Parsed::Matched { handler, matches }),
            None => Err(CliError::Parse(
                cli.clone()
                    .error(ErrorKind::MissingSubcommand, "no command specified"),
            )),
        }
    }

    fn locate(&self, matches: &ArgMatches) -> Option<(usize, ArgMatches)> {
        let mut level = &self.top;
        let mut current = matches;
        loop {
            let (name, sub) = current.subcommand()?;
            let index = *level
                .iter()
                .find(|&&i| self.nodes[i].spec.get_name() == name)?;
            match self.nodes[index].handler {
                Some(handler) => return Some((handler, sub.clone())),
                None => {
                    level = &self.nodes[index].children;
                    current = sub;
                }
            }
        }
    }

    pub fn handler_mut(&mut self, index: usize) -> Option<&mut (dyn Command + 'static)> {
        self.handlers.get_mut(index).map(|h| h.as_mut())
    }

    /// Names of registered leaf commands, as space-separated paths.
    pub fn command_paths(&self) -> Vec<String> {
        let mut paths = Vec::new();
        for &i in &self.top {
            self.collect_paths(i, String::new(), &mut paths);
        }
        paths
    }

    fn collect_paths(&self, index: usize, prefix: String, paths: &mut Vec<String>) {
        let node = &self.nodes[index];
        let path = if prefix.is_empty() {
            node.spec.get_name().to_string()
        } else {
            format!("{prefix} {}", node.spec.get_name())
        };
        if node.handler.is_some() {
            paths.push(path.clone());
        }
        for &child in &node.children {
            self.collect_paths(child, path.clone(), paths);
        }
    }
}

/// Apply the "set" action of an optional flag.
///
/// Only a value typed on the command line marks the target as set; defaults
/// and absent flags leave it untouched.
pub fn bind_optional<T>(matches: &ArgMatches, id: &str, target: &mut Optional<T>) -> CliResult<()>
where
    T: FromStr + Default,
    T::Err: Display,
{
    if matches.value_source(id) != Some(ValueSource::CommandLine) {
        return Ok(());
    }
    let raw = matches
        .get_raw(id)
        .and_then(|mut values| values.next())
        .ok_or_else(|| CliError::MissingFlag(id.to_string()))?;
    let invalid = |source| CliError::InvalidFlag {
        flag: id.to_string(),
        source,
    };
    let text = raw.to_str().ok_or_else(|| {
        invalid(ParseError {
            input: raw.to_string_lossy().into_owned(),
            expected: "UTF-8 text",
            reason: "invalid UTF-8".to_string(),
        })
    })?;
    target.set(text).map_err(invalid)
}

/// Value of a flag clap already enforced as required.
pub fn required<T>(matches: &ArgMatches, id: &str) -> CliResult<T>
where
    T: Clone + Send + Sync + 'static,
{
    matches
        .get_one::<T>(id)
        .cloned()
        .ok_or_else(|| CliError::MissingFlag(id.to_string()))
}
