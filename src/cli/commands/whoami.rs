//! `whoami`: verify the API token and show the associated user

use std::io::BufRead;
use std::sync::Arc;

use clap::ArgMatches;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::api::{ApiError, TOKEN_HEADER};
use crate::cli::error::{CliError, CliResult, IoResultExt};
use crate::cli::output::{self, SyncWriter};
use crate::cli::registry::{Base, Command, ExecContext, HasBase, HasConfig, Namespace};
use crate::config::{Settings, Source};
use crate::infrastructure::traits::HttpRequest;

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
    #[serde(default)]
    login: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Verification {
    customer: Named,
    user: Named,
}

#[derive(Debug)]
pub struct WhoamiCommand {
    base: Base,
}

impl WhoamiCommand {
    pub fn new(globals: Arc<Settings>) -> Self {
        Self {
            base: Base::new("whoami", globals),
        }
    }

    pub fn register(parent: &mut Namespace<'_>, globals: Arc<Settings>) {
        let spec = clap::Command::new("whoami").about("Get information about the currently authenticated account");
        parent.command(spec, Box::new(Self::new(globals)));
    }
}

impl HasBase for WhoamiCommand {
    fn base(&self) -> &Base {
        &self.base
    }
}

impl Command for WhoamiCommand {
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
        let token = self.config().token(ctx.flags.token.as_deref());
        if token.source == Source::Undefined {
            return Err(CliError::NoToken);
        }
        let endpoint = self.config().endpoint(ctx.flags.endpoint.as_deref());

        let url = format!("{}/verify", endpoint.value.trim_end_matches('/'));
        let request = HttpRequest::get(url).header(TOKEN_HEADER, token.value);
        let response = ctx.container.transport.send(&request)?;
        debug!(status = response.status, "verify response");
        if !response.is_success() {
            return Err(ApiError::from_response(&response).into());
        }

        let verified: Verification =
            serde_json::from_str(&response.body).map_err(ApiError::from)?;
        let user = match verified.user.login {
            Some(login) => format!("{} ({login})", verified.user.name),
            None => verified.user.name,
        };

        output::detail(out, "Customer", &verified.customer.name).with_context("write output")?;
        output::detail(out, "User", &user).with_context("write output")
    }
}
