//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Config file: `$XDG_CONFIG_HOME/fastly/config.toml`
//! 3. Environment variables: `FASTLY_API_*`
//! 4. Command-line flags, applied per call and never persisted

pub mod env;
pub mod file;

use std::fmt;

pub use env::{EnvMap, Environment};
pub use file::{File, FileRead};

use crate::api::DEFAULT_ENDPOINT;

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Undefined,
    Default,
    File,
    Environment,
    Flag,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Source::Undefined => "not set",
            Source::Default => "default",
            Source::File => "config file",
            Source::Environment => "environment",
            Source::Flag => "flag",
        };
        f.write_str(s)
    }
}

/// A value tagged with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sourced<T> {
    pub value: T,
    pub source: Source,
}

impl<T> Sourced<T> {
    pub fn new(value: T, source: Source) -> Self {
        Self { value, source }
    }
}

/// Resolved configuration for one invocation.
///
/// Built once, then shared read-only; flag overrides are computed per call
/// and never written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    token: Option<Sourced<String>>,
    endpoint: Sourced<String>,
    email: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            token: None,
            endpoint: Sourced::new(DEFAULT_ENDPOINT.to_string(), Source::Default),
            email: None,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl Settings {
    /// Merge defaults, file and environment.
    pub fn resolve(file: &File, env: &Environment) -> Self {
        Self::default().apply_file(file).apply_env(env)
    }

    fn apply_file(mut self, file: &File) -> Self {
        if let Some(token) = non_empty(&file.user.token) {
            self.token = Some(Sourced::new(token.to_string(), Source::File));
        }
        if let Some(endpoint) = non_empty(&file.fastly.api_endpoint) {
            self.endpoint = Sourced::new(endpoint.to_string(), Source::File);
        }
        if let Some(email) = non_empty(&file.user.email) {
            self.email = Some(email.to_string());
        }
        self
    }

    fn apply_env(mut self, env: &Environment) -> Self {
        if let Some(token) = non_empty(&env.token) {
            self.token = Some(Sourced::new(token.to_string(), Source::Environment));
        }
        if let Some(endpoint) = non_empty(&env.endpoint) {
            self.endpoint = Sourced::new(endpoint.to_string(), Source::Environment);
        }
        self
    }

    /// API token, with a `--token` flag value taking precedence.
    ///
    /// Returns an empty value tagged `Source::Undefined` when nothing is set.
    pub fn token(&self, flag: Option<&str>) -> Sourced<String> {
        match flag.filter(|f| !f.is_empty()) {
            Some(f) => Sourced::new(f.to_string(), Source::Flag),
            None => self
                .token
                .clone()
                .unwrap_or_else(|| Sourced::new(String::new(), Source::Undefined)),
        }
    }

    /// API endpoint, with an `--endpoint` flag value taking precedence.
    pub fn endpoint(&self, flag: Option<&str>) -> Sourced<String> {
        match flag.filter(|f| !f.is_empty()) {
            Some(f) => Sourced::new(f.to_string(), Source::Flag),
            None => self.endpoint.clone(),
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}
