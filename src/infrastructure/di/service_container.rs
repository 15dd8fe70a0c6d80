//! Service container for dependency injection
//!
//! Holds every external dependency of the dispatcher so that `run` stays a
//! function of its explicit arguments.

use std::path::PathBuf;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::cli::app::api_client;
use crate::cli::error::CliResult;
use crate::infrastructure::traits::{
    FileSystem, HttpTransport, RealFileSystem, ReqwestTransport,
};
use crate::manifest::MANIFEST_FILE_NAME;
use crate::update::{GitHubVersioner, Versioner};

/// Builds an API client from a token and an endpoint.
pub type ClientFactory = Arc<dyn Fn(&str, &str) -> CliResult<Box<dyn ApiClient>> + Send + Sync>;

/// Container holding the dispatcher's dependencies.
pub struct ServiceContainer {
    /// Config file location, written by `configure`
    pub config_path: PathBuf,

    /// Project manifest location
    pub manifest_path: PathBuf,

    /// API client constructor
    pub client_factory: ClientFactory,

    /// HTTP transport for direct requests
    pub transport: Arc<dyn HttpTransport>,

    /// Latest-release lookup
    pub versioner: Arc<dyn Versioner>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(config_path: PathBuf) -> CliResult<Self> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
        let versioner = Arc::new(GitHubVersioner::new(Arc::clone(&transport)));
        Ok(Self::with_deps(
            config_path,
            PathBuf::from(MANIFEST_FILE_NAME),
            Arc::new(api_client),
            transport,
            versioner,
            Arc::new(RealFileSystem),
        ))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        config_path: PathBuf,
        manifest_path: PathBuf,
        client_factory: ClientFactory,
        transport: Arc<dyn HttpTransport>,
        versioner: Arc<dyn Versioner>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            config_path,
            manifest_path,
            client_factory,
            transport,
            versioner,
            fs,
        }
    }
}
