//! Error classification
//!
//! [`deduce`] maps any error into a small, closed set of kinds and attaches a
//! remediation hint where one is known. [`ClassifiedError::print`] renders the
//! result for the user. Only `main` calls into this module; everything below
//! it just returns errors.

use std::error::Error;
use std::fmt;
use std::io::Write;

use crate::api::ApiError;
use crate::cli::error::CliError;
use crate::cli::output;
use crate::infrastructure::TransportError;
use crate::optional::ParseError;

pub const SERVICE_ID_REMEDIATION: &str =
    "Please provide one via the --service-id flag or within your fastly.toml manifest file.";

pub const TOKEN_REMEDIATION: &str =
    "Provide an API token with --token or FASTLY_API_TOKEN, or run `fastly configure` to store one.";

pub const CONFIG_REMEDIATION: &str =
    "Check the config file, or run `fastly configure` to write a fresh one.";

pub const PARSE_REMEDIATION: &str = "Run `fastly --help` to see the available commands and flags.";

pub const AUTH_REMEDIATION: &str =
    "Check that the API token is valid and has access to this service. Run `fastly whoami` to verify it.";

pub const NOT_FOUND_REMEDIATION: &str = "Check the service ID and version number.";

pub const NETWORK_REMEDIATION: &str =
    "Check your network connection and the API endpoint (--endpoint or FASTLY_API_ENDPOINT).";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or invalid local configuration (service ID, token, config file).
    Configuration,
    /// Arguments rejected before execution.
    Parse,
    /// The API answered with an error.
    RemoteApi,
    /// The API could not be reached.
    Transport,
    Unclassified,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Parse => "parse",
            ErrorKind::RemoteApi => "remote API",
            ErrorKind::Transport => "transport",
            ErrorKind::Unclassified => "unclassified",
        };
        f.write_str(name)
    }
}

/// A failure ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub summary: String,
    pub detail: Option<String>,
    pub remediation: Option<&'static str>,
}

impl ClassifiedError {
    fn new(kind: ErrorKind, summary: impl Into<String>) -> Self {
        Self {
            kind,
            summary: summary.into(),
            detail: None,
            remediation: None,
        }
    }

    fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }

    fn with_remediation(mut self, remediation: &'static str) -> Self {
        self.remediation = Some(remediation);
        self
    }

    /// Write the error block. Write failures are ignored.
    pub fn print(&self, w: &mut dyn Write) {
        let _ = self.write_to(w);
    }

    fn write_to(&self, w: &mut dyn Write) -> std::io::Result<()> {
        output::error(w, &self.summary)?;
        if let Some(detail) = &self.detail {
            output::detail(w, "Detail", detail)?;
        }
        if let Some(remediation) = self.remediation {
            output::blank(w)?;
            output::info(w, remediation)?;
        }
        Ok(())
    }
}

/// The error followed by its transitive sources.
fn chain<'a>(err: &'a (dyn Error + 'static)) -> impl Iterator<Item = &'a (dyn Error + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

/// Join the chain into one line, skipping causes already spelled out by
/// their parent's message.
fn chain_message(err: &(dyn Error + 'static)) -> String {
    let mut message = String::new();
    for cause in chain(err) {
        let text = cause.to_string();
        if text.is_empty() || message.contains(&text) {
            continue;
        }
        if !message.is_empty() {
            message.push_str(": ");
        }
        message.push_str(&text);
    }
    message
}

fn from_clap(err: &clap::Error) -> ClassifiedError {
    let rendered = err.render().to_string();
    let summary = rendered
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(|l| l.strip_prefix("error: ").unwrap_or(l).to_string())
        .unwrap_or_else(|| err.kind().to_string());
    let usage = rendered
        .lines()
        .map(str::trim)
        .find(|l| l.starts_with("Usage:"))
        .map(str::to_string);
    ClassifiedError::new(ErrorKind::Parse, summary)
        .with_detail(usage)
        .with_remediation(PARSE_REMEDIATION)
}

fn from_api(err: &ApiError, top: &(dyn Error + 'static)) -> Option<ClassifiedError> {
    match err {
        ApiError::Response {
            status, detail, ..
        } => {
            let classified = ClassifiedError::new(ErrorKind::RemoteApi, err.to_string())
                .with_detail(detail.clone());
            Some(match status {
                401 | 403 => classified.with_remediation(AUTH_REMEDIATION),
                404 => classified.with_remediation(NOT_FOUND_REMEDIATION),
                _ => classified,
            })
        }
        ApiError::Decode(_) => Some(ClassifiedError::new(ErrorKind::RemoteApi, chain_message(top))),
        // the wrapped transport error is classified on the next link
        ApiError::Transport(_) => None,
    }
}

/// Classify `err` by walking its source chain.
pub fn deduce(err: &(dyn Error + 'static)) -> ClassifiedError {
    for cause in chain(err) {
        if let Some(e) = cause.downcast_ref::<CliError>() {
            match e {
                CliError::NoServiceId => {
                    return ClassifiedError::new(ErrorKind::Configuration, e.to_string())
                        .with_remediation(SERVICE_ID_REMEDIATION)
                }
                CliError::NoToken => {
                    return ClassifiedError::new(ErrorKind::Configuration, e.to_string())
                        .with_remediation(TOKEN_REMEDIATION)
                }
                CliError::Config { .. } => {
                    return ClassifiedError::new(ErrorKind::Configuration, e.to_string())
                        .with_remediation(CONFIG_REMEDIATION)
                }
                CliError::InvalidFlag { .. } | CliError::MissingFlag(_) => {
                    return ClassifiedError::new(ErrorKind::Parse, chain_message(cause))
                        .with_remediation(PARSE_REMEDIATION)
                }
                _ => continue,
            }
        }
        if let Some(e) = cause.downcast_ref::<clap::Error>() {
            return from_clap(e);
        }
        if let Some(e) = cause.downcast_ref::<ApiError>() {
            if let Some(classified) = from_api(e, cause) {
                return classified;
            }
            continue;
        }
        if cause.downcast_ref::<TransportError>().is_some() {
            return ClassifiedError::new(ErrorKind::Transport, chain_message(err))
                .with_remediation(NETWORK_REMEDIATION);
        }
        if cause.downcast_ref::<ParseError>().is_some() {
            return ClassifiedError::new(ErrorKind::Parse, chain_message(err))
                .with_remediation(PARSE_REMEDIATION);
        }
    }
    ClassifiedError::new(ErrorKind::Unclassified, chain_message(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::HttpResponse;
    use std::io;

    #[test]
    fn given_no_service_id_when_deducing_then_configuration_with_remediation() {
        let classified = deduce(&CliError::NoServiceId);
        assert_eq!(classified.kind, ErrorKind::Configuration);
        assert_eq!(classified.summary, "error reading service: no service ID found");
        assert_eq!(classified.remediation, Some(SERVICE_ID_REMEDIATION));
    }

    #[test]
    fn given_api_error_wrapped_in_cli_error_when_deducing_then_remote_api_with_detail() {
        let response = HttpResponse {
            status: 400,
            body: r#"{"msg":"Bad request","detail":"Invalid value for 'url'"}"#.to_string(),
        };
        let err = CliError::from(ApiError::from_response(&response));

        let classified = deduce(&err);

        assert_eq!(classified.kind, ErrorKind::RemoteApi);
        assert!(classified.summary.contains("Bad request"));
        assert_eq!(classified.detail.as_deref(), Some("Invalid value for 'url'"));
        assert_eq!(classified.remediation, None);
    }

    #[test]
    fn given_unauthorized_response_when_deducing_then_auth_remediation() {
        let response = HttpResponse {
            status: 401,
            body: r#"{"msg":"Provided credentials are missing or invalid"}"#.to_string(),
        };
        let classified = deduce(&CliError::from(ApiError::from_response(&response)));
        assert_eq!(classified.remediation, Some(AUTH_REMEDIATION));
    }

    #[test]
    fn given_transport_error_behind_api_error_when_deducing_then_transport() {
        let err = CliError::from(ApiError::from(TransportError::request(
            "https://api.fastly.com/service",
            "connection refused",
        )));
        let classified = deduce(&err);
        assert_eq!(classified.kind, ErrorKind::Transport);
        assert!(classified.summary.contains("connection refused"));
        assert_eq!(classified.remediation, Some(NETWORK_REMEDIATION));
    }

    #[test]
    fn given_io_error_when_deducing_then_unclassified_with_chain() {
        let err = CliError::io(
            "write output",
            io::Error::new(io::ErrorKind::BrokenPipe, "broken pipe"),
        );
        let classified = deduce(&err);
        assert_eq!(classified.kind, ErrorKind::Unclassified);
        assert_eq!(classified.summary, "I/O error: write output: broken pipe");
        assert_eq!(classified.remediation, None);
    }

    #[test]
    fn given_nested_error_when_walking_chain_then_yields_every_link_in_order() {
        // Arrange
        let err = CliError::from(ApiError::from(TransportError::request(
            "https://api.fastly.com/verify",
            "timed out",
        )));

        // Act
        let links: Vec<&(dyn Error + 'static)> = chain(&err).collect();

        // Assert
        assert_eq!(links.len(), 3);
        assert!(links[0].downcast_ref::<CliError>().is_some());
        assert!(links[1].downcast_ref::<ApiError>().is_some());
        assert!(links[2].downcast_ref::<TransportError>().is_some());
    }
}
