//! `version`: print the running version and check for a newer release

use std::io::BufRead;
use std::sync::Arc;

use clap::ArgMatches;
use tracing::instrument;

use crate::cli::error::{CliResult, IoResultExt};
use crate::cli::output::{self, SyncWriter};
use crate::cli::registry::{Base, Command, ExecContext, HasBase, Namespace};
use crate::config::Settings;
use crate::update::{self, UpdateStatus, Version, CURRENT_VERSION};

#[derive(Debug)]
pub struct VersionCommand {
    base: Base,
}

impl VersionCommand {
    pub fn new(globals: Arc<Settings>) -> Self {
        Self {
            base: Base::new("version", globals),
        }
    }

    pub fn register(parent: &mut Namespace<'_>, globals: Arc<Settings>) {
        let spec = clap::Command::new("version").about("Display version information for the Fastly CLI");
        parent.command(spec, Box::new(Self::new(globals)));
    }
}

impl HasBase for VersionCommand {
    fn base(&self) -> &Base {
        &self.base
    }
}

impl Command for VersionCommand {
    fn bind(&mut self, _matches: &ArgMatches) -> CliResult<()> {
        Ok(())
    }

    fn requires_client(&self) -> bool {
        false
    }

    #[instrument(skip_all)]
    fn exec(
        &mut self,
        ctx: &ExecContext<'_>,
        _input: &mut dyn BufRead,
        out: &mut SyncWriter,
    ) -> CliResult<()> {
        output::info(out, &format!("Fastly CLI version v{CURRENT_VERSION}"))
            .with_context("write output")?;

        let current = Version::current()?;
        if let UpdateStatus::Available { current, latest } =
            update::check(&current, ctx.container.versioner.as_ref())
        {
            output::blank(out).with_context("write output")?;
            output::warning(out, "A new version of the Fastly CLI is available.")
                .with_context("write output")?;
            output::detail(out, "Current version", &current).with_context("write output")?;
            output::detail(out, "Latest version", &latest).with_context("write output")?;
        }
        Ok(())
    }
}
