//! End-to-end tests of `run`: registry, dispatch and the bundled commands.
//!
//! Every test injects its own environment map, a temp directory for the
//! config file and manifest, and fakes for the network-facing dependencies.

use std::fs;
use std::sync::Arc;

use rstest::rstest;
use tempfile::TempDir;

use fastly_cli::api::{CreateLogshuttleInput, DEFAULT_ENDPOINT, TOKEN_HEADER};
use fastly_cli::cli::{build_registry, deduce, CliError, ErrorKind};
use fastly_cli::config::{EnvMap, FileRead, Settings};
use fastly_cli::infrastructure::traits::{Method, RealFileSystem};
use fastly_cli::manifest::MANIFEST_FILE_NAME;
use fastly_cli::update::Version;
use fastly_cli::util::testing::{
    env_of, init_test_setup, invoke, test_container, ApiRecorder, StubTransport, StubVersioner,
};

const CREATE: &[&str] = &[
    "logshuttle",
    "create",
    "-n",
    "test",
    "-s",
    "abc123",
    "--version",
    "1",
    "--url",
    "https://example.com",
    "--auth-token",
    "tok",
];

fn with_args(base: &[&str], extra: &[&str]) -> Vec<String> {
    base.iter().chain(extra).map(|s| s.to_string()).collect()
}

fn refs(args: &[String]) -> Vec<&str> {
    args.iter().map(String::as_str).collect()
}

fn expected_input() -> CreateLogshuttleInput {
    CreateLogshuttleInput {
        service: "abc123".to_string(),
        version: 1,
        name: Some("test".to_string()),
        url: Some("https://example.com".to_string()),
        token: Some("tok".to_string()),
        ..Default::default()
    }
}

// ============================================================
// logshuttle create
// ============================================================

#[test]
fn given_required_flags_and_empty_sources_when_creating_then_input_built_and_success_printed() {
    // Arrange
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(dir.path(), recorder.factory());

    // Act
    let run = invoke(CREATE, &EnvMap::new(), &container, "");

    // Assert
    assert!(run.result.is_ok(), "{:?}", run.result);
    assert_eq!(recorder.inputs(), vec![expected_input()]);
    assert!(run.output.contains("SUCCESS"));
    assert!(run
        .output
        .contains("Created Logshuttle logging endpoint test (service abc123 version 1)"));
    assert_eq!(
        recorder.constructed(),
        vec![(String::new(), DEFAULT_ENDPOINT.to_string())]
    );
}

#[test]
fn given_no_service_id_flag_and_no_manifest_when_creating_then_configuration_error_before_api_call() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(dir.path(), recorder.factory());
    let args: Vec<&str> = CREATE
        .iter()
        .copied()
        .filter(|a| *a != "-s" && *a != "abc123")
        .collect();

    // Act
    let run = invoke(&args, &EnvMap::new(), &container, "");

    // Assert
    let err = run.result.unwrap_err();
    assert!(matches!(err, CliError::NoServiceId), "{err:?}");
    assert_eq!(deduce(&err).kind, ErrorKind::Configuration);
    assert!(recorder.inputs().is_empty());
    assert!(!run.output.contains("SUCCESS"));
}

#[test]
fn given_manifest_with_service_id_when_creating_without_flag_then_manifest_value_used() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(MANIFEST_FILE_NAME),
        "manifest_version = 1\nservice_id = \"from-manifest\"\n",
    )
    .unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(dir.path(), recorder.factory());
    let args: Vec<&str> = CREATE
        .iter()
        .copied()
        .filter(|a| *a != "-s" && *a != "abc123")
        .collect();

    let run = invoke(&args, &EnvMap::new(), &container, "");

    assert!(run.result.is_ok(), "{:?}", run.result);
    assert_eq!(recorder.inputs()[0].service, "from-manifest");
}

#[test]
fn given_all_optional_flags_when_creating_then_every_field_carried() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(dir.path(), recorder.factory());
    let args = with_args(
        CREATE,
        &[
            "--format",
            "%h %l %u",
            "--format-version",
            "2",
            "--response-condition",
            "errors-only",
            "--placement",
            "waf_debug",
        ],
    );

    // Act
    let run = invoke(&refs(&args), &EnvMap::new(), &container, "");

    // Assert
    assert!(run.result.is_ok(), "{:?}", run.result);
    let input = &recorder.inputs()[0];
    assert_eq!(input.format.as_deref(), Some("%h %l %u"));
    assert_eq!(input.format_version, Some(2));
    assert_eq!(input.response_condition.as_deref(), Some("errors-only"));
    assert_eq!(input.placement.as_deref(), Some("waf_debug"));
}

#[rstest]
#[case::zero_is_explicit(&["--format-version", "0"], Some(0), None)]
#[case::empty_string_is_explicit(&["--placement", ""], None, Some(""))]
#[case::absent(&[], None, None)]
fn given_optional_flags_when_creating_then_set_state_preserved(
    #[case] extra: &[&str],
    #[case] format_version: Option<u32>,
    #[case] placement: Option<&str>,
) {
    let dir = TempDir::new().unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(dir.path(), recorder.factory());
    let args = with_args(CREATE, extra);

    let run = invoke(&refs(&args), &EnvMap::new(), &container, "");

    assert!(run.result.is_ok(), "{:?}", run.result);
    let input = &recorder.inputs()[0];
    assert_eq!(input.format_version, format_version);
    assert_eq!(input.placement.as_deref(), placement);
    assert_eq!(input.format, None);
}

#[test]
fn given_add_alias_when_dispatching_then_create_runs() {
    let dir = TempDir::new().unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(dir.path(), recorder.factory());
    let mut args = CREATE.to_vec();
    args[1] = "add";

    let run = invoke(&args, &EnvMap::new(), &container, "");

    assert!(run.result.is_ok(), "{:?}", run.result);
    assert_eq!(recorder.inputs(), vec![expected_input()]);
}

#[test]
fn given_unparsable_optional_value_when_creating_then_parse_error_and_no_api_call() {
    let dir = TempDir::new().unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(dir.path(), recorder.factory());
    let args = with_args(CREATE, &["--format-version", "two"]);

    let run = invoke(&refs(&args), &EnvMap::new(), &container, "");

    let err = run.result.unwrap_err();
    assert!(matches!(err, CliError::InvalidFlag { .. }), "{err:?}");
    assert_eq!(deduce(&err).kind, ErrorKind::Parse);
    assert!(recorder.inputs().is_empty());
}

#[test]
fn given_api_rejection_when_creating_then_remote_api_error() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(
        dir.path(),
        recorder.failing_factory(400, r#"{"msg":"Bad request","detail":"Invalid url"}"#),
    );

    // Act
    let run = invoke(CREATE, &EnvMap::new(), &container, "");

    // Assert
    let classified = deduce(&run.result.unwrap_err());
    assert_eq!(classified.kind, ErrorKind::RemoteApi);
    assert_eq!(classified.detail.as_deref(), Some("Invalid url"));
    assert_eq!(recorder.inputs().len(), 1);
}

// ============================================================
// Global flags and configuration sources
// ============================================================

#[test]
fn given_token_in_env_and_flag_when_dispatching_then_flag_token_reaches_factory() {
    let dir = TempDir::new().unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(dir.path(), recorder.factory());
    let env = env_of(&[
        ("FASTLY_API_TOKEN", "env-token"),
        ("FASTLY_API_ENDPOINT", "http://localhost:8080"),
    ]);
    let args = with_args(CREATE, &["--token", "flag-token"]);

    let run = invoke(&refs(&args), &env, &container, "");

    assert!(run.result.is_ok(), "{:?}", run.result);
    assert_eq!(
        recorder.constructed(),
        vec![("flag-token".to_string(), "http://localhost:8080".to_string())]
    );
}

#[test]
fn given_config_file_and_env_when_dispatching_then_env_token_wins() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "[user]\ntoken = \"file-token\"\n",
    )
    .unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(dir.path(), recorder.factory());

    let from_file = invoke(CREATE, &EnvMap::new(), &container, "");
    let from_env = invoke(
        CREATE,
        &env_of(&[("FASTLY_API_TOKEN", "env-token")]),
        &container,
        "",
    );

    assert!(from_file.result.is_ok() && from_env.result.is_ok());
    let tokens: Vec<String> = recorder.constructed().into_iter().map(|(t, _)| t).collect();
    assert_eq!(tokens, vec!["file-token", "env-token"]);
}

#[test]
fn given_verbose_flag_when_creating_then_provenance_reported() {
    let dir = TempDir::new().unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(dir.path(), recorder.factory());
    let args = with_args(CREATE, &["--verbose"]);

    let run = invoke(
        &refs(&args),
        &env_of(&[("FASTLY_API_TOKEN", "env-token")]),
        &container,
        "",
    );

    assert!(run.result.is_ok(), "{:?}", run.result);
    assert!(run.output.contains("provided via environment"), "{}", run.output);
    assert!(run.output.contains(DEFAULT_ENDPOINT));
    assert!(run.output.contains("abc123 (from --service-id flag)"));
}

// ============================================================
// Parse failures and help
// ============================================================

#[rstest]
#[case::unknown_command(&["frobnicate"])]
#[case::unknown_subcommand(&["logshuttle", "frobnicate"])]
#[case::missing_required_flag(&["logshuttle", "create", "-n", "test", "--version", "1"])]
#[case::non_numeric_version(&["logshuttle", "create", "-n", "t", "--version", "one", "--url", "u", "--auth-token", "a"])]
#[case::namespace_without_command(&["logshuttle"])]
fn given_invalid_arguments_when_dispatching_then_parse_error_without_client(#[case] args: &[&str]) {
    let dir = TempDir::new().unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(dir.path(), recorder.factory());

    let run = invoke(args, &EnvMap::new(), &container, "");

    let err = run.result.unwrap_err();
    assert!(matches!(err, CliError::Parse(_)), "{err:?}");
    assert_eq!(deduce(&err).kind, ErrorKind::Parse);
    assert!(recorder.constructed().is_empty());
}

#[rstest]
#[case::help_flag(&["--help"])]
#[case::no_arguments(&[])]
#[case::subcommand_help(&["logshuttle", "create", "--help"])]
fn given_help_request_when_dispatching_then_help_rendered_and_ok(#[case] args: &[&str]) {
    let dir = TempDir::new().unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(dir.path(), recorder.factory());

    let run = invoke(args, &EnvMap::new(), &container, "");

    assert!(run.result.is_ok(), "{:?}", run.result);
    assert!(run.output.contains("Usage"), "{}", run.output);
    assert!(recorder.constructed().is_empty());
}

#[test]
fn given_registry_when_listing_then_all_commands_present() {
    let registry = build_registry(&Arc::new(Settings::default()));

    let paths = registry.command_paths();

    for expected in ["configure", "whoami", "version", "completion", "logshuttle create"] {
        assert!(paths.iter().any(|p| p == expected), "missing {expected}: {paths:?}");
    }
}

// ============================================================
// configure
// ============================================================

#[test]
fn given_token_flag_when_configuring_then_token_written_and_other_fields_kept() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "[user]\nemail = \"dev@example.com\"\n").unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(dir.path(), recorder.factory());

    // Act
    let run = invoke(
        &["configure", "--token", "new-token", "--endpoint", "https://api.example.com"],
        &EnvMap::new(),
        &container,
        "",
    );

    // Assert
    assert!(run.result.is_ok(), "{:?}", run.result);
    let file = FileRead::load(&RealFileSystem, &config_path).into_file();
    assert_eq!(file.user.token.as_deref(), Some("new-token"));
    assert_eq!(file.user.email.as_deref(), Some("dev@example.com"));
    assert_eq!(file.fastly.api_endpoint.as_deref(), Some("https://api.example.com"));
    assert!(recorder.constructed().is_empty());
}

#[test]
fn given_no_token_flag_when_configuring_then_token_read_from_input() {
    let dir = TempDir::new().unwrap();
    let container = test_container(dir.path(), ApiRecorder::default().factory());

    let run = invoke(&["configure"], &EnvMap::new(), &container, "piped-token\n");

    assert!(run.result.is_ok(), "{:?}", run.result);
    assert!(run.output.contains("Fastly API token:"));
    let file = FileRead::load(&RealFileSystem, &dir.path().join("config.toml")).into_file();
    assert_eq!(file.user.token.as_deref(), Some("piped-token"));
}

#[test]
fn given_empty_input_when_configuring_then_no_token_and_nothing_written() {
    let dir = TempDir::new().unwrap();
    let container = test_container(dir.path(), ApiRecorder::default().factory());

    let run = invoke(&["configure"], &EnvMap::new(), &container, "\n");

    assert!(matches!(run.result, Err(CliError::NoToken)));
    assert!(!dir.path().join("config.toml").exists());
}

// ============================================================
// whoami
// ============================================================

const VERIFY_BODY: &str = r#"{
    "customer": {"id": "c1", "name": "Example Corp"},
    "user": {"id": "u1", "name": "Dev Example", "login": "dev@example.com"}
}"#;

#[test]
fn given_token_when_whoami_then_verify_called_and_identity_printed() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(StubTransport::ok(200, VERIFY_BODY));
    let mut container = test_container(dir.path(), ApiRecorder::default().factory());
    container.transport = transport.clone();

    // Act
    let run = invoke(
        &["whoami"],
        &env_of(&[("FASTLY_API_TOKEN", "env-token")]),
        &container,
        "",
    );

    // Assert
    assert!(run.result.is_ok(), "{:?}", run.result);
    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::Get);
    assert_eq!(requests[0].url, format!("{DEFAULT_ENDPOINT}/verify"));
    assert_eq!(requests[0].header_value(TOKEN_HEADER), Some("env-token"));
    assert!(run.output.contains("Example Corp"));
    assert!(run.output.contains("Dev Example (dev@example.com)"));
}

#[test]
fn given_no_token_when_whoami_then_no_token_error_and_no_request() {
    let dir = TempDir::new().unwrap();
    let transport = Arc::new(StubTransport::ok(200, VERIFY_BODY));
    let mut container = test_container(dir.path(), ApiRecorder::default().factory());
    container.transport = transport.clone();

    let run = invoke(&["whoami"], &EnvMap::new(), &container, "");

    assert!(matches!(run.result, Err(CliError::NoToken)));
    assert!(transport.requests().is_empty());
}

#[rstest]
#[case::rejected(Some(401), ErrorKind::RemoteApi)]
#[case::unreachable(None, ErrorKind::Transport)]
fn given_failing_verify_when_whoami_then_classified(
    #[case] status: Option<u16>,
    #[case] kind: ErrorKind,
) {
    let dir = TempDir::new().unwrap();
    let mut container = test_container(dir.path(), ApiRecorder::default().factory());
    container.transport = Arc::new(match status {
        Some(status) => StubTransport::ok(status, r#"{"msg":"Provided credentials are missing or invalid"}"#),
        None => StubTransport::unreachable(),
    });

    let run = invoke(&["whoami", "-t", "bad"], &EnvMap::new(), &container, "");

    assert_eq!(deduce(&run.result.unwrap_err()).kind, kind);
}

// ============================================================
// version and completion
// ============================================================

#[test]
fn given_newer_release_when_version_then_upgrade_reported() {
    let dir = TempDir::new().unwrap();
    let mut container = test_container(dir.path(), ApiRecorder::default().factory());
    container.versioner = Arc::new(StubVersioner::latest(Version::new(999, 0, 0)));

    let run = invoke(&["version"], &EnvMap::new(), &container, "");

    assert!(run.result.is_ok(), "{:?}", run.result);
    assert!(run.output.contains("Fastly CLI version v"));
    assert!(run.output.contains("A new version of the Fastly CLI is available."));
    assert!(run.output.contains("999.0.0"));
}

#[test]
fn given_unreachable_release_index_when_version_then_succeeds_without_notice() {
    let dir = TempDir::new().unwrap();
    let container = test_container(dir.path(), ApiRecorder::default().factory());

    let run = invoke(&["version"], &EnvMap::new(), &container, "");

    assert!(run.result.is_ok(), "{:?}", run.result);
    assert!(!run.output.contains("new version"));
}

#[test]
fn given_shell_when_completion_then_script_covers_command_tree() {
    let dir = TempDir::new().unwrap();
    let recorder = ApiRecorder::default();
    let container = test_container(dir.path(), recorder.factory());

    let run = invoke(&["completion", "bash"], &EnvMap::new(), &container, "");

    assert!(run.result.is_ok(), "{:?}", run.result);
    assert!(run.output.contains("fastly"));
    assert!(run.output.contains("logshuttle"));
    assert!(recorder.constructed().is_empty());
}
