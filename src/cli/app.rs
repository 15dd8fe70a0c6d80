//! Dispatcher: resolves configuration, parses arguments and runs one command

use std::io::{BufRead, Write};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::api::{ApiClient, HttpApiClient};
use crate::cli::commands::{completion, configure, logshuttle, version, whoami};
use crate::cli::error::{CliError, CliResult, IoResultExt};
use crate::cli::output::{self, SyncWriter};
use crate::cli::registry::{ExecContext, GlobalFlags, Parsed, Registry};
use crate::config::{EnvMap, Environment, FileRead, Settings, Source};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::ReqwestTransport;
use crate::manifest::ManifestData;
use crate::update::CURRENT_VERSION;

/// Program name as shown in usage and completions.
pub const APP_NAME: &str = "fastly";

/// Real client factory: rejects a missing token, then talks HTTP.
pub fn api_client(token: &str, endpoint: &str) -> CliResult<Box<dyn ApiClient>> {
    if token.is_empty() {
        return Err(CliError::NoToken);
    }
    let transport = Arc::new(ReqwestTransport::new()?);
    Ok(Box::new(HttpApiClient::new(token, endpoint, transport)))
}

fn root_command() -> clap::Command {
    clap::Command::new(APP_NAME)
        .version(CURRENT_VERSION)
        .about("A tool to interact with the Fastly API")
        .args(GlobalFlags::args())
}

/// Build the full command tree for one invocation.
pub fn build_registry(globals: &Arc<Settings>) -> Registry {
    let mut registry = Registry::new(root_command());
    {
        let mut root = registry.root();
        configure::ConfigureCommand::register(&mut root, Arc::clone(globals));
        whoami::WhoamiCommand::register(&mut root, Arc::clone(globals));
        version::VersionCommand::register(&mut root, Arc::clone(globals));
        completion::CompletionCommand::register(&mut root, Arc::clone(globals));

        let mut logging = root.namespace(
            clap::Command::new("logshuttle")
                .about("Manipulate Fastly service version Logshuttle logging endpoints"),
        );
        logshuttle::CreateCommand::register(&mut logging, Arc::clone(globals));
    }
    registry
}

fn report_provenance(out: &mut dyn Write, token: Source, endpoint: &str) -> CliResult<()> {
    let token_line = match token {
        Source::Undefined => "not provided".to_string(),
        source => format!("provided via {source}"),
    };
    output::detail(out, "Fastly API token", &token_line).with_context("write output")?;
    output::detail(out, "Fastly API endpoint", endpoint).with_context("write output")
}

/// Run one invocation.
///
/// Every dependency is a parameter: the argument vector (without program
/// name), the flattened environment, the config file read at startup, the
/// service container, and the input/output streams. Errors are returned
/// unchanged for the caller to classify.
#[instrument(skip_all, fields(args = args.len()))]
pub fn run(
    args: &[String],
    env: &EnvMap,
    file: FileRead,
    container: &ServiceContainer,
    input: &mut dyn BufRead,
    out: &mut SyncWriter,
) -> CliResult<()> {
    let file = file.into_file();
    let settings = Arc::new(Settings::resolve(&file, &Environment::read(env)));

    let mut registry = build_registry(&settings);
    let cli = registry.to_clap();
    let (handler, matches) = match registry.parse(&cli, args)? {
        Parsed::Rendered(text) => {
            return out.write_all(text.as_bytes()).with_context("write help");
        }
        Parsed::Matched { handler, matches } => (handler, matches),
    };

    let flags = GlobalFlags::from_matches(&matches);
    let command = registry
        .handler_mut(handler)
        .ok_or_else(|| CliError::config(format!("no handler registered at index {handler}")))?;
    command.bind(&matches)?;
    debug!(command = command.name(), "dispatching");

    let client = if command.requires_client() {
        let token = settings.token(flags.token.as_deref());
        let endpoint = settings.endpoint(flags.endpoint.as_deref());
        if flags.verbose {
            report_provenance(out, token.source, &endpoint.value)?;
        }
        Some((container.client_factory)(&token.value, &endpoint.value)?)
    } else {
        None
    };

    let ctx = ExecContext {
        client,
        manifest: ManifestData::load(container.fs.as_ref(), &container.manifest_path),
        flags,
        file: &file,
        container,
        cli: &cli,
    };
    command.exec(&ctx, input, out)
}
