//! Environment source
//!
//! The process environment is flattened once into an [`EnvMap`]; the
//! recognized `FASTLY_*` keys are then picked out with the `config` crate.

use std::collections::BTreeMap;

use config::Config;
use tracing::warn;

/// Prefix shared by all recognized variables.
pub const ENV_PREFIX: &str = "FASTLY";

/// API token override.
pub const TOKEN_VAR: &str = "FASTLY_API_TOKEN";

/// API endpoint override.
pub const ENDPOINT_VAR: &str = "FASTLY_API_ENDPOINT";

/// Flattened `KEY=VALUE` environment.
pub type EnvMap = BTreeMap<String, String>;

/// Flatten raw `KEY=VALUE` entries into a map.
///
/// Entries without `=` or with an empty key are skipped. A key seen more
/// than once keeps the last value.
pub fn parse_environ<I, S>(entries: I) -> EnvMap
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut env = EnvMap::new();
    for entry in entries {
        if let Some((key, value)) = entry.as_ref().split_once('=') {
            if !key.is_empty() {
                env.insert(key.to_string(), value.to_string());
            }
        }
    }
    env
}

/// Snapshot of the current process environment.
pub fn from_process() -> EnvMap {
    parse_environ(std::env::vars_os().map(|(k, v)| {
        format!("{}={}", k.to_string_lossy(), v.to_string_lossy())
    }))
}

/// Values contributed by the environment layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    pub token: Option<String>,
    pub endpoint: Option<String>,
}

impl Environment {
    /// Pick the recognized keys out of `vars`.
    ///
    /// Keys match exactly: `fastly_api_token` is not `FASTLY_API_TOKEN`.
    /// No validation happens here: unknown keys are ignored and empty values
    /// count as unset.
    pub fn read(vars: &EnvMap) -> Self {
        // the config layer lowercases keys, so drop near-misses before it sees them
        let source: config::Map<String, String> = vars
            .iter()
            .filter(|(k, _)| k.as_str() == TOKEN_VAR || k.as_str() == ENDPOINT_VAR)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let built = Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .ignore_empty(true)
                    .source(Some(source)),
            )
            .build();

        match built {
            Ok(config) => Self {
                token: config.get_string("api_token").ok(),
                endpoint: config.get_string("api_endpoint").ok(),
            },
            Err(e) => {
                warn!("ignoring environment overrides: {e}");
                Self::default()
            }
        }
    }
}
