//! `configure`: persist an API token (and optionally an endpoint)

use std::io::BufRead;
use std::sync::Arc;

use clap::ArgMatches;
use tracing::{info, instrument};

use crate::cli::error::{CliError, CliResult, IoResultExt};
use crate::cli::output::{self, SyncWriter};
use crate::cli::registry::{Base, Command, ExecContext, HasBase, Namespace};
use crate::config::Settings;

#[derive(Debug)]
pub struct ConfigureCommand {
    base: Base,
}

impl ConfigureCommand {
    pub fn new(globals: Arc<Settings>) -> Self {
        Self {
            base: Base::new("configure", globals),
        }
    }

    pub fn register(parent: &mut Namespace<'_>, globals: Arc<Settings>) {
        let spec = clap::Command::new("configure")
            .about("Configure the Fastly CLI")
            .long_about(
                "Store an API token, and optionally an API endpoint, in the user config file. \
                 The token is taken from --token or read from standard input.",
            );
        parent.command(spec, Box::new(Self::new(globals)));
    }
}

/// Read one line from `input`, trimmed.
fn read_token(input: &mut dyn BufRead, out: &mut SyncWriter) -> CliResult<String> {
    output::prompt(out, "Fastly API token:").with_context("write prompt")?;
    let mut line = String::new();
    input.read_line(&mut line).with_context("read token")?;
    Ok(line.trim().to_string())
}

impl HasBase for ConfigureCommand {
    fn base(&self) -> &Base {
        &self.base
    }
}

impl Command for ConfigureCommand {
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
        input: &mut dyn BufRead,
        out: &mut SyncWriter,
    ) -> CliResult<()> {
        let token = match ctx.flags.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => token.to_string(),
            None => read_token(input, out)?,
        };
        if token.is_empty() {
            return Err(CliError::NoToken);
        }

        let mut file = ctx.file.clone();
        file.user.token = Some(token);
        if let Some(endpoint) = ctx.flags.endpoint.as_deref().filter(|e| !e.is_empty()) {
            file.fastly.api_endpoint = Some(endpoint.to_string());
        }

        let path = &ctx.container.config_path;
        file.write(ctx.container.fs.as_ref(), path)?;
        info!(path = %path.display(), "configuration written");

        output::success(out, "Configured the Fastly CLI").with_context("write output")?;
        output::detail(out, "Config file", &path.display()).with_context("write output")
    }
}
