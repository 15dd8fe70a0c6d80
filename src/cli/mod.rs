//! CLI layer: command registry, dispatch and user-facing output

pub mod app;
pub mod classify;
pub mod commands;
pub mod error;
pub mod output;
pub mod registry;

pub use app::{build_registry, run, APP_NAME};
pub use classify::{deduce, ClassifiedError, ErrorKind};
pub use error::{CliError, CliResult};
pub use output::SyncWriter;
