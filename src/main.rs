use std::io::{self, BufReader};
use std::process;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use fastly_cli::cli::{deduce, run, SyncWriter};
use fastly_cli::config::{env, file, FileRead};
use fastly_cli::infrastructure::di::ServiceContainer;

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "FASTLY_LOG";

fn main() {
    setup_logging();

    let env = env::from_process();
    let config_path = file::default_path();
    let container = match ServiceContainer::new(config_path) {
        Ok(container) => container,
        Err(e) => {
            deduce(&e).print(&mut io::stderr());
            process::exit(1);
        }
    };
    let file = FileRead::load(container.fs.as_ref(), &container.config_path);

    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let mut input = BufReader::new(io::stdin());
    let mut out = SyncWriter::new(io::stdout());

    if let Err(e) = run(&args, &env, file, &container, &mut input, &mut out) {
        deduce(&e).print(&mut io::stderr());
        process::exit(1);
    }
}

fn setup_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    // Create a subscriber with formatted output directed to stderr
    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(filter))
        .init();

    tracing::debug!("INIT: logging configured from {LOG_ENV}");
}
