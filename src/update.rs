//! Release version checks
//!
//! The lookup itself may fail for any number of reasons; [`check`] folds all
//! of them into [`UpdateStatus::Unknown`] so it can never block a command.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::infrastructure::traits::{HttpRequest, HttpTransport};
use crate::infrastructure::TransportError;

/// Version of the running binary.
pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Latest-release endpoint of the public repository.
pub const RELEASES_URL: &str = "https://api.github.com/repos/fastly/cli/releases/latest";

#[derive(Error, Debug)]
pub enum UpdateError {
    #[error("cannot fetch latest release")]
    Fetch(#[from] TransportError),

    #[error("release index returned status {0}")]
    Status(u16),

    #[error("cannot decode release index")]
    Decode(#[from] serde_json::Error),

    #[error("invalid version: {0:?}")]
    InvalidVersion(String),
}

/// `major.minor.patch`, compared numerically.
///
/// A leading `v` and any pre-release or build suffix are accepted and
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn current() -> Result<Self, UpdateError> {
        CURRENT_VERSION.parse()
    }
}

impl FromStr for Version {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || UpdateError::InvalidVersion(s.to_string());
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let core = trimmed.split(['-', '+']).next().unwrap_or_default();

        let mut parts = core.split('.').map(|p| p.parse::<u64>().map_err(|_| invalid()));
        let version = Version {
            major: parts.next().ok_or_else(invalid)??,
            minor: parts.next().ok_or_else(invalid)??,
            patch: parts.next().ok_or_else(invalid)??,
        };
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(version)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Source of the latest published version.
pub trait Versioner: Send + Sync {
    fn latest_version(&self) -> Result<Version, UpdateError>;
}

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
}

/// Reads the latest release tag from the GitHub releases API.
pub struct GitHubVersioner {
    transport: Arc<dyn HttpTransport>,
    url: String,
}

impl GitHubVersioner {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_url(transport, RELEASES_URL)
    }

    pub fn with_url(transport: Arc<dyn HttpTransport>, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
        }
    }
}

impl Versioner for GitHubVersioner {
    #[instrument(skip(self), fields(url = %self.url))]
    fn latest_version(&self) -> Result<Version, UpdateError> {
        let request = HttpRequest::get(&self.url).header("Accept", "application/vnd.github+json");
        let response = self.transport.send(&request)?;
        if !response.is_success() {
            return Err(UpdateError::Status(response.status));
        }
        let release: Release = serde_json::from_str(&response.body)?;
        debug!(tag = %release.tag_name, "latest release");
        release.tag_name.parse()
    }
}

/// Result of comparing the running version with the latest release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    Available { current: Version, latest: Version },
    /// The release index could not be consulted.
    Unknown,
}

pub fn is_newer(current: &Version, latest: &Version) -> bool {
    latest > current
}

/// Compare `current` against the latest release, failing open.
pub fn check(current: &Version, versioner: &dyn Versioner) -> UpdateStatus {
    match versioner.latest_version() {
        Ok(latest) if is_newer(current, &latest) => UpdateStatus::Available {
            current: *current,
            latest,
        },
        Ok(_) => UpdateStatus::UpToDate,
        Err(e) => {
            warn!("update check failed: {e}");
            UpdateStatus::Unknown
        }
    }
}
