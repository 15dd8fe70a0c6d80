//! File source
//!
//! The user config file lives at a fixed, well-known path. Reading it is
//! best-effort: a missing or unparsable file is reported as such and the
//! caller decides to carry on with an empty record.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::error::{CliError, CliResult, IoResultExt};
use crate::infrastructure::traits::FileSystem;

/// File name inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// `[fastly]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FastlySection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
}

/// `[user]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Structured content of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    pub fastly: FastlySection,
    pub user: UserSection,
}

/// Outcome of reading the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRead {
    Loaded(File),
    Absent,
    Unreadable { path: PathBuf, reason: String },
}

impl FileRead {
    /// Read and parse the file at `path`.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Self {
        if !fs.exists(path) {
            debug!(path = %path.display(), "no config file");
            return Self::Absent;
        }
        let parsed = fs
            .read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| File::from_toml(&content).map_err(|e| e.to_string()));
        match parsed {
            Ok(file) => Self::Loaded(file),
            Err(reason) => {
                debug!(path = %path.display(), %reason, "config file unreadable, ignoring");
                Self::Unreadable {
                    path: path.to_path_buf(),
                    reason,
                }
            }
        }
    }

    /// The loaded record, or an empty one when the file was absent or unreadable.
    pub fn into_file(self) -> File {
        match self {
            Self::Loaded(file) => file,
            Self::Absent | Self::Unreadable { .. } => File::default(),
        }
    }
}

impl File {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> CliResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CliError::config(format!("serialize config: {e}")))
    }

    /// Persist the record, creating the parent directory when needed.
    pub fn write(&self, fs: &dyn FileSystem, path: &Path) -> CliResult<()> {
        let content = self.to_toml()?;
        fs.ensure_parent(path)
            .with_context(&format!("create directory for {}", path.display()))?;
        fs.write(path, &content)
            .with_context(&format!("write {}", path.display()))
    }
}

/// Get the XDG config directory for the CLI.
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("com", "Fastly", "fastly").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the config file.
///
/// Falls back to the working directory when no home directory is known.
pub fn default_path() -> PathBuf {
    config_dir()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}
