//! CLI smoke tests: argument handling, config inspection, setup refusal.

mod common;

use std::fs;

use serde_json::Value;

#[test]
fn version_flag_prints_version() {
    let tmp = tempfile::tempdir().unwrap();
    let result = common::run_cli_case(
        "version_flag_prints_version",
        &tmp.path().join("config.toml"),
        &["--version"],
        &[],
    );
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("kedastral-tui 0.3.0"),
        "unexpected version output; log: {}",
        result.log_path.display()
    );
}

#[test]
fn help_flag_lists_connection_options() {
    let tmp = tempfile::tempdir().unwrap();
    let result = common::run_cli_case(
        "help_flag_lists_connection_options",
        &tmp.path().join("config.toml"),
        &["--help"],
        &[],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    for flag in ["--forecaster-url", "--scaler-url", "--workload", "--no-setup"] {
        assert!(
            result.stdout.contains(flag),
            "help is missing {flag}; log: {}",
            result.log_path.display()
        );
    }
}

#[test]
fn missing_workload_without_setup_exits_with_usage_code() {
    let tmp = tempfile::tempdir().unwrap();
    let result = common::run_cli_case(
        "missing_workload_without_setup_exits_with_usage_code",
        &tmp.path().join("config.toml"),
        &["--forecaster-url", "http://127.0.0.1:1", "--no-setup"],
        &[],
    );
    assert_eq!(
        result.status.code(),
        Some(2),
        "log: {}",
        result.log_path.display()
    );
    assert!(result.stderr.contains("KTUI-1004"), "stderr: {}", result.stderr);
    assert!(result.stderr.contains("--workload"), "stderr: {}", result.stderr);
}

#[test]
fn closed_stdin_refuses_to_run_the_wizard() {
    let tmp = tempfile::tempdir().unwrap();
    let config_path = tmp.path().join("config.toml");
    let result = common::run_cli_case(
        "closed_stdin_refuses_to_run_the_wizard",
        &config_path,
        &[],
        &[],
    );
    assert_eq!(result.status.code(), Some(2), "stderr: {}", result.stderr);
    assert!(result.stderr.contains("--forecaster-url"));
    assert!(!config_path.exists(), "nothing should be saved");
}

#[test]
fn sub_second_refresh_interval_is_rejected() {
    let tmp = tempfile::tempdir().unwrap();
    let result = common::run_cli_case(
        "sub_second_refresh_interval_is_rejected",
        &tmp.path().join("config.toml"),
        &[
            "--forecaster-url",
            "http://127.0.0.1:1",
            "--workload",
            "api",
            "--refresh-interval",
            "500ms",
        ],
        &[],
    );
    assert_eq!(result.status.code(), Some(2), "stderr: {}", result.stderr);
    assert!(result.stderr.contains("KTUI-1001"), "stderr: {}", result.stderr);
    assert!(result.stderr.contains("at least 1s"), "stderr: {}", result.stderr);
}

#[test]
fn malformed_duration_flag_is_a_usage_error() {
    let tmp = tempfile::tempdir().unwrap();
    let result = common::run_cli_case(
        "malformed_duration_flag_is_a_usage_error",
        &tmp.path().join("config.toml"),
        &["--lead-time", "soon", "config"],
        &[],
    );
    assert_eq!(result.status.code(), Some(2), "stderr: {}", result.stderr);
}

#[test]
fn config_reports_defaults_when_file_is_missing() {
    let tmp = tempfile::tempdir().unwrap();
    let result = common::run_cli_case(
        "config_reports_defaults_when_file_is_missing",
        &tmp.path().join("config.toml"),
        &["config"],
        &[],
    );
    assert!(result.status.success(), "stderr: {}", result.stderr);
    assert!(result.stdout.contains("does not exist"));
    assert!(result.stdout.contains("scaler_url = \"http://localhost:8082\""));
    assert!(result.stdout.contains("refresh_interval_ms = 5000"));
}

#[test]
fn config_json_reflects_file_env_and_flags() {
    let tmp = tempfile::tempdir().unwrap();
    let config_path = tmp.path().join("config.toml");
    fs::write(
        &config_path,
        "forecaster_url = \"http://file:8081\"\nworkload = \"from-file\"\ntheme = \"light\"\n",
    )
    .unwrap();

    let result = common::run_cli_case(
        "config_json_reflects_file_env_and_flags",
        &config_path,
        &["--workload", "from-flag", "config", "--json"],
        &[("FORECASTER_URL", "http://env:8081")],
    );
    assert!(result.status.success(), "stderr: {}", result.stderr);

    let payload: Value = serde_json::from_str(&result.stdout).expect("config --json is JSON");
    assert_eq!(payload["exists"], Value::Bool(true));
    assert_eq!(payload["config"]["forecaster_url"], "http://env:8081");
    assert_eq!(payload["config"]["workload"], "from-flag");
    assert_eq!(payload["config"]["theme"], "light");
}

#[test]
fn unparseable_config_file_exits_with_usage_code() {
    let tmp = tempfile::tempdir().unwrap();
    let config_path = tmp.path().join("config.toml");
    fs::write(&config_path, "forecaster_url = [not toml").unwrap();

    let result = common::run_cli_case(
        "unparseable_config_file_exits_with_usage_code",
        &config_path,
        &["config"],
        &[],
    );
    assert_eq!(result.status.code(), Some(2), "stderr: {}", result.stderr);
    assert!(result.stderr.contains("KTUI-1003"), "stderr: {}", result.stderr);
}

#[test]
fn setup_with_closed_stdin_saves_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let config_path = tmp.path().join("config.toml");
    let result = common::run_cli_case(
        "setup_with_closed_stdin_saves_nothing",
        &config_path,
        &["setup"],
        &[],
    );
    assert!(!result.status.success(), "stdout: {}", result.stdout);
    assert!(!config_path.exists());
}

#[test]
fn bash_completions_are_generated() {
    let tmp = tempfile::tempdir().unwrap();
    let result = common::run_cli_case(
        "bash_completions_are_generated",
        &tmp.path().join("config.toml"),
        &["completions", "bash"],
        &[],
    );
    assert!(result.status.success(), "stderr: {}", result.stderr);
    assert!(result.stdout.contains("kedastral-tui"));
}
