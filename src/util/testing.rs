//! Test support: logging setup and in-process fakes for the injected
//! dependencies.

use std::collections::BTreeMap;
use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Arc, Mutex, Once, PoisonError};

use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::api::{ApiClient, ApiError, CreateLogshuttleInput, Logshuttle};
use crate::cli::error::CliResult;
use crate::cli::output::SyncWriter;
use crate::cli::run;
use crate::config::{EnvMap, FileRead};
use crate::infrastructure::di::{ClientFactory, ServiceContainer};
use crate::infrastructure::traits::{HttpRequest, HttpResponse, HttpTransport, RealFileSystem};
use crate::infrastructure::{TransportError, TransportResult};
use crate::manifest::MANIFEST_FILE_NAME;
use crate::update::{UpdateError, Version, Versioner, RELEASES_URL};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "debug");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory output sink whose contents survive the writer.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&locked(&self.0)).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        locked(&self.0).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Client handed out by [`ApiRecorder`]: records inputs, answers from them.
struct MockApiClient {
    inputs: Arc<Mutex<Vec<CreateLogshuttleInput>>>,
    failure: Option<HttpResponse>,
}

impl ApiClient for MockApiClient {
    fn create_logshuttle(&self, input: &CreateLogshuttleInput) -> Result<Logshuttle, ApiError> {
        locked(&self.inputs).push(input.clone());
        if let Some(response) = &self.failure {
            return Err(ApiError::from_response(response));
        }
        Ok(Logshuttle {
            name: input.name.clone().unwrap_or_default(),
            service_id: input.service.clone(),
            version: input.version,
            url: input.url.clone(),
            format: input.format.clone(),
            format_version: input.format_version,
            response_condition: input.response_condition.clone(),
            placement: input.placement.clone(),
        })
    }
}

/// Records client construction and every request made through the client.
#[derive(Clone, Default)]
pub struct ApiRecorder {
    inputs: Arc<Mutex<Vec<CreateLogshuttleInput>>>,
    constructed: Arc<Mutex<Vec<(String, String)>>>,
}

impl ApiRecorder {
    /// Factory whose clients succeed.
    pub fn factory(&self) -> ClientFactory {
        self.build_factory(None)
    }

    /// Factory whose clients fail every call with the given response.
    pub fn failing_factory(&self, status: u16, body: &str) -> ClientFactory {
        self.build_factory(Some(HttpResponse {
            status,
            body: body.to_string(),
        }))
    }

    fn build_factory(&self, failure: Option<HttpResponse>) -> ClientFactory {
        let recorder = self.clone();
        Arc::new(move |token: &str, endpoint: &str| -> CliResult<Box<dyn ApiClient>> {
            locked(&recorder.constructed).push((token.to_string(), endpoint.to_string()));
            Ok(Box::new(MockApiClient {
                inputs: Arc::clone(&recorder.inputs),
                failure: failure.clone(),
            }))
        })
    }

    /// Inputs passed to `create_logshuttle`, in call order.
    pub fn inputs(&self) -> Vec<CreateLogshuttleInput> {
        locked(&self.inputs).clone()
    }

    /// `(token, endpoint)` pairs the factory was called with.
    pub fn constructed(&self) -> Vec<(String, String)> {
        locked(&self.constructed).clone()
    }
}

/// Transport answering every request with one canned result.
pub struct StubTransport {
    reply: TransportResult<HttpResponse>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl StubTransport {
    pub fn ok(status: u16, body: &str) -> Self {
        Self {
            reply: Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reply: Err(TransportError::request("stub://", "connection refused")),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        locked(&self.requests).clone()
    }
}

impl HttpTransport for StubTransport {
    fn send(&self, request: &HttpRequest) -> TransportResult<HttpResponse> {
        locked(&self.requests).push(request.clone());
        self.reply.clone()
    }
}

/// Versioner with a fixed answer.
pub struct StubVersioner(Option<Version>);

impl StubVersioner {
    pub fn latest(version: Version) -> Self {
        Self(Some(version))
    }

    pub fn failing() -> Self {
        Self(None)
    }
}

impl Versioner for StubVersioner {
    fn latest_version(&self) -> Result<Version, UpdateError> {
        self.0
            .ok_or_else(|| TransportError::request(RELEASES_URL, "connection refused").into())
    }
}

/// Container rooted in `dir`: config at `dir/config.toml`, manifest at
/// `dir/fastly.toml`, real filesystem, unreachable network, failing
/// version lookups.
pub fn test_container(dir: &Path, client_factory: ClientFactory) -> ServiceContainer {
    ServiceContainer::with_deps(
        dir.join("config.toml"),
        dir.join(MANIFEST_FILE_NAME),
        client_factory,
        Arc::new(StubTransport::unreachable()),
        Arc::new(StubVersioner::failing()),
        Arc::new(RealFileSystem),
    )
}

/// Captured result of one [`run`] invocation.
pub struct Invocation {
    pub result: CliResult<()>,
    pub output: String,
}

/// Run `args` against the container's config file and the given environment.
pub fn invoke(args: &[&str], env: &EnvMap, container: &ServiceContainer, stdin: &str) -> Invocation {
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    let buffer = SharedBuffer::default();
    let mut out = SyncWriter::new(buffer.clone());
    let file = FileRead::load(container.fs.as_ref(), &container.config_path);
    let result = run(&args, env, file, container, &mut stdin.as_bytes(), &mut out);
    Invocation {
        result,
        output: buffer.contents(),
    }
}

/// An environment map from literal pairs.
pub fn env_of(pairs: &[(&str, &str)]) -> EnvMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<BTreeMap<_, _>>()
}
