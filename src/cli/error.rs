//! CLI-level errors (wraps API, transport and parse errors)

use std::io;

use thiserror::Error;

use crate::api::ApiError;
use crate::infrastructure::TransportError;
use crate::optional::ParseError;
use crate::update::UpdateError;

/// CLI errors are the top-level error type.
/// These are what get classified and displayed to the user.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("error reading service: no service ID found")]
    NoServiceId,

    #[error("no token provided")]
    NoToken,

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("{0}")]
    Parse(#[from] clap::Error),

    #[error("invalid value for --{flag}")]
    InvalidFlag {
        flag: String,
        #[source]
        source: ParseError,
    },

    #[error("missing value for --{0}")]
    MissingFlag(String),

    #[error("{0}")]
    Api(#[from] ApiError),

    #[error("{0}")]
    Transport(#[from] TransportError),

    #[error("error checking for updates")]
    Update(#[from] UpdateError),

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl CliError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

/// Extension trait for converting `io::Result` to `CliResult` with context.
pub trait IoResultExt<T> {
    /// Attach a short description of what was being attempted.
    ///
    /// # Example
    /// ```ignore
    /// fs.write(&path, &body).with_context("write config file")?;
    /// ```
    fn with_context(self, action: &str) -> CliResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_context(self, action: &str) -> CliResult<T> {
        self.map_err(|e| CliError::io(action, e))
    }
}
