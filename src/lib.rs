//! Execution core of the Fastly command-line client.
//!
//! [`cli::run`] is the single entry point: it resolves configuration from
//! the file and environment sources, parses the arguments against the
//! command registry and executes the matched command with every dependency
//! injected. Failures are returned to the caller, which classifies them with
//! [`cli::deduce`].

pub mod api;
pub mod cli;
pub mod config;
pub mod infrastructure;
pub mod manifest;
pub mod optional;
pub mod update;
pub mod util;
