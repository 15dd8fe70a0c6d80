//! Project manifest (`fastly.toml`) and service ID resolution

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::cli::error::{CliError, CliResult};
use crate::infrastructure::traits::FileSystem;

/// Manifest file name, looked up in the working directory.
pub const MANIFEST_FILE_NAME: &str = "fastly.toml";

/// Fields of the manifest the CLI core cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ManifestFile {
    pub manifest_version: Option<u32>,
    pub name: Option<String>,
    pub service_id: Option<String>,
}

/// Outcome of reading the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestRead {
    Loaded(ManifestFile),
    Absent,
    Unreadable { path: PathBuf, reason: String },
}

impl ManifestRead {
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Self {
        if !fs.exists(path) {
            return Self::Absent;
        }
        let parsed = fs
            .read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| toml::from_str(&content).map_err(|e| e.to_string()));
        match parsed {
            Ok(file) => Self::Loaded(file),
            Err(reason) => {
                debug!(path = %path.display(), %reason, "manifest unreadable, ignoring");
                Self::Unreadable {
                    path: path.to_path_buf(),
                    reason,
                }
            }
        }
    }

    /// The loaded manifest, or an empty one.
    pub fn into_file(self) -> ManifestFile {
        match self {
            Self::Loaded(file) => file,
            Self::Absent | Self::Unreadable { .. } => ManifestFile::default(),
        }
    }
}

/// Provenance of a resolved service ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Undefined,
    Flag,
    Manifest,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Undefined => f.write_str("not set"),
            Source::Flag => f.write_str("--service-id flag"),
            Source::Manifest => write!(f, "{MANIFEST_FILE_NAME} manifest"),
        }
    }
}

/// Manifest content available to a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestData {
    pub file: ManifestFile,
}

impl ManifestData {
    pub fn new(file: ManifestFile) -> Self {
        Self { file }
    }

    /// Load the manifest at `path`, empty when absent or unreadable.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Self {
        Self::new(ManifestRead::load(fs, path).into_file())
    }

    /// Resolve the service ID: flag first, then manifest.
    ///
    /// Yields an empty ID tagged `Source::Undefined` when neither is present.
    pub fn service_id(&self, flag: Option<&str>) -> (String, Source) {
        if let Some(id) = flag.filter(|f| !f.is_empty()) {
            return (id.to_string(), Source::Flag);
        }
        match self.file.service_id.as_deref().filter(|s| !s.is_empty()) {
            Some(id) => (id.to_string(), Source::Manifest),
            None => (String::new(), Source::Undefined),
        }
    }

    /// Like [`ManifestData::service_id`], failing with `NoServiceId` when undefined.
    pub fn require_service_id(&self, flag: Option<&str>) -> CliResult<(String, Source)> {
        match self.service_id(flag) {
            (_, Source::Undefined) => Err(CliError::NoServiceId),
            resolved => Ok(resolved),
        }
    }
}
