//! Optional flag values
//!
//! A flag that may be omitted from an outgoing request must keep "not
//! supplied" apart from "supplied with the zero value". `Optional<T>` records
//! both the parsed value and whether the user actually passed it.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Raw command-line input that could not be converted to the target type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse {input:?} as {expected}: {reason}")]
pub struct ParseError {
    pub input: String,
    pub expected: &'static str,
    pub reason: String,
}

/// A value plus a marker telling whether it was explicitly set.
///
/// `value` holds `T::default()` until [`Optional::set`] succeeds. Always go
/// through [`Optional::as_option`] (or check [`Optional::is_set`]) before
/// putting the value into a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Optional<T> {
    value: T,
    is_set: bool,
}

pub type OptionalString = Optional<String>;
pub type OptionalUint = Optional<u32>;
pub type OptionalBool = Optional<bool>;

impl<T> Optional<T>
where
    T: FromStr + Default,
    T::Err: fmt::Display,
{
    /// Parse `raw`, store it and mark the value as set.
    ///
    /// On failure the previous state is left untouched.
    pub fn set(&mut self, raw: &str) -> Result<(), ParseError> {
        let parsed = raw.parse::<T>().map_err(|e| ParseError {
            input: raw.to_string(),
            expected: short_type_name::<T>(),
            reason: e.to_string(),
        })?;
        self.value = parsed;
        self.is_set = true;
        Ok(())
    }
}

impl<T> Optional<T> {
    pub fn is_set(&self) -> bool {
        self.is_set
    }

    /// The stored value, which is `T::default()` when unset.
    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn as_option(&self) -> Option<&T> {
        self.is_set.then_some(&self.value)
    }
}

impl<T: Clone> Optional<T> {
    /// Owned copy of the value, `None` when the flag was never passed.
    pub fn to_option(&self) -> Option<T> {
        self.as_option().cloned()
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
