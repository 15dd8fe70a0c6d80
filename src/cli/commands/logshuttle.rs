//! `logshuttle` commands

use std::io::BufRead;
use std::sync::Arc;

use clap::{value_parser, Arg, ArgMatches};
use tracing::{debug, instrument};

use crate::api::CreateLogshuttleInput;
use crate::cli::error::{CliResult, IoResultExt};
use crate::cli::output::{self, SyncWriter};
use crate::cli::registry::{
    bind_optional, required, Base, Command, ExecContext, HasBase, Namespace,
};
use crate::config::Settings;
use crate::optional::{OptionalString, OptionalUint};

/// `logshuttle create`: create a Logshuttle logging endpoint.
#[derive(Debug)]
pub struct CreateCommand {
    base: Base,

    service_id: Option<String>,

    // required
    endpoint_name: String,
    version: u32,
    token: String,
    url: String,

    // optional
    format: OptionalString,
    format_version: OptionalUint,
    response_condition: OptionalString,
    placement: OptionalString,
}

impl CreateCommand {
    pub fn new(globals: Arc<Settings>) -> Self {
        Self {
            base: Base::new("create", globals),
            service_id: None,
            endpoint_name: String::new(),
            version: 0,
            token: String::new(),
            url: String::new(),
            format: OptionalString::default(),
            format_version: OptionalUint::default(),
            response_condition: OptionalString::default(),
            placement: OptionalString::default(),
        }
    }

    pub fn register(parent: &mut Namespace<'_>, globals: Arc<Settings>) {
        let spec = clap::Command::new("create")
            .about("Create a Logshuttle logging endpoint on a Fastly service version")
            .visible_alias("add")
            .arg(
                Arg::new("name")
                    .short('n')
                    .long("name")
                    .required(true)
                    .help("The name of the Logshuttle logging object. Used as a primary key for API access"),
            )
            .arg(
                Arg::new("service-id")
                    .short('s')
                    .long("service-id")
                    .help("Service ID"),
            )
            .arg(
                Arg::new("version")
                    .long("version")
                    .required(true)
                    .value_parser(value_parser!(u32))
                    .help("Number of service version"),
            )
            .arg(
                Arg::new("url")
                    .long("url")
                    .required(true)
                    .help("Your Log Shuttle endpoint url"),
            )
            .arg(
                Arg::new("auth-token")
                    .long("auth-token")
                    .required(true)
                    .help("The data authentication token associated with this endpoint"),
            )
            .arg(
                Arg::new("format")
                    .long("format")
                    .help("Apache style log formatting"),
            )
            .arg(
                Arg::new("format-version")
                    .long("format-version")
                    .help("The version of the custom logging format used for the configured endpoint. Can be either 2 (default) or 1"),
            )
            .arg(
                Arg::new("response-condition")
                    .long("response-condition")
                    .help("The name of an existing condition in the configured endpoint, or leave blank to always execute"),
            )
            .arg(
                Arg::new("placement")
                    .long("placement")
                    .help("Where in the generated VCL the logging call should be placed, overriding any format_version default. Can be none or waf_debug"),
            );
        parent.command(spec, Box::new(Self::new(globals)));
    }

    /// Request input for the resolved service. Unset optionals stay `None`.
    pub fn create_input(&self, service_id: String) -> CreateLogshuttleInput {
        CreateLogshuttleInput {
            service: service_id,
            version: self.version,
            name: Some(self.endpoint_name.clone()),
            url: Some(self.url.clone()),
            token: Some(self.token.clone()),
            format: self.format.to_option(),
            format_version: self.format_version.to_option(),
            response_condition: self.response_condition.to_option(),
            placement: self.placement.to_option(),
        }
    }
}

impl HasBase for CreateCommand {
    fn base(&self) -> &Base {
        &self.base
    }
}

impl Command for CreateCommand {
    fn bind(&mut self, matches: &ArgMatches) -> CliResult<()> {
        self.endpoint_name = required(matches, "name")?;
        self.service_id = matches.get_one::<String>("service-id").cloned();
        self.version = required(matches, "version")?;
        self.url = required(matches, "url")?;
        self.token = required(matches, "auth-token")?;

        bind_optional(matches, "format", &mut self.format)?;
        bind_optional(matches, "format-version", &mut self.format_version)?;
        bind_optional(matches, "response-condition", &mut self.response_condition)?;
        bind_optional(matches, "placement", &mut self.placement)
    }

    #[instrument(skip_all, fields(name = %self.endpoint_name, version = self.version))]
    fn exec(
        &mut self,
        ctx: &ExecContext<'_>,
        _input: &mut dyn BufRead,
        out: &mut SyncWriter,
    ) -> CliResult<()> {
        let (service_id, source) = ctx.manifest.require_service_id(self.service_id.as_deref())?;
        debug!(%service_id, %source, "resolved service ID");
        if ctx.flags.verbose {
            output::detail(out, "Service ID", &format!("{service_id} (from {source})"))
                .with_context("write output")?;
        }

        let input = self.create_input(service_id);
        let created = ctx.client()?.create_logshuttle(&input)?;

        output::success(
            out,
            &format!(
                "Created Logshuttle logging endpoint {} (service {} version {})",
                created.name, created.service_id, created.version
            ),
        )
        .with_context("write output")
    }
}
