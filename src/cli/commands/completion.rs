//! `completion`: generate shell completions for the full command tree

use std::io::{BufRead, Write};
use std::sync::Arc;

use clap::{value_parser, Arg, ArgMatches};
use clap_complete::{generate, Shell};

use crate::cli::app::APP_NAME;
use crate::cli::error::{CliError, CliResult, IoResultExt};
use crate::cli::output::SyncWriter;
use crate::cli::registry::{required, Base, Command, ExecContext, HasBase, Namespace};
use crate::config::Settings;

#[derive(Debug)]
pub struct CompletionCommand {
    base: Base,
    shell: Option<Shell>,
}

impl CompletionCommand {
    pub fn new(globals: Arc<Settings>) -> Self {
        Self {
            base: Base::new("completion", globals),
            shell: None,
        }
    }

    pub fn register(parent: &mut Namespace<'_>, globals: Arc<Settings>) {
        let spec = clap::Command::new("completion")
            .about("Generate shell completion script")
            .arg(
                Arg::new("shell")
                    .required(true)
                    .value_parser(value_parser!(Shell))
                    .help("Target shell"),
            );
        parent.command(spec, Box::new(Self::new(globals)));
    }
}

impl HasBase for CompletionCommand {
    fn base(&self) -> &Base {
        &self.base
    }
}

impl Command for CompletionCommand {
    fn bind(&mut self, matches: &ArgMatches) -> CliResult<()> {
        self.shell = Some(required(matches, "shell")?);
        Ok(())
    }

    fn requires_client(&self) -> bool {
        false
    }

    fn exec(
        &mut self,
        ctx: &ExecContext<'_>,
        _input: &mut dyn BufRead,
        out: &mut SyncWriter,
    ) -> CliResult<()> {
        let Some(shell) = self.shell else {
            return Err(CliError::MissingFlag("shell".into()));
        };
        let mut cli = ctx.cli.clone();
        generate(shell, &mut cli, APP_NAME, out);
        out.flush().with_context("write completions")
    }
}
