//! Integration tests for the `baobab` CLI binary.
//!
//! Argument parsing, help output, completions, and config handling run
//! without a server; the record commands run against a wiremock server.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `baobab` binary with env isolation.
///
/// Clears all `BAOBAB_*` env vars and points config directories at
/// `home` so tests never touch the user's real configuration.
fn baobab_cmd_in(home: &str) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("baobab");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env_remove("RUST_LOG")
        .env_remove("BAOBAB_PROFILE")
        .env_remove("BAOBAB_SERVER")
        .env_remove("BAOBAB_SERVER_SECRET")
        .env_remove("BAOBAB_LOGIN_ID")
        .env_remove("BAOBAB_PASSWORD")
        .env_remove("BAOBAB_LOGIN_TIMEOUT")
        .env_remove("BAOBAB_OUTPUT")
        .env_remove("BAOBAB_INSECURE")
        .env_remove("BAOBAB_TIMEOUT");
    cmd
}

fn baobab_cmd() -> assert_cmd::Command {
    baobab_cmd_in("/tmp/baobab-cli-test-nonexistent")
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Run a command off the async runtime so the mock server keeps serving.
async fn run(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

async fn mock_server(with_login: bool) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/json/baseline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "baseline": {"plugins": ["people", "places", "things"]}
        })))
        .mount(&server)
        .await;
    if with_login {
        Mock::given(method("GET"))
            .and(path("/login"))
            .respond_with(ResponseTemplate::new(200).set_body_string("api-key-123"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/people/logins/my_info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "my_info": {"id": 1, "name": "Curator", "lang": "en", "login_id": "curator"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/json/people/people/my_info"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;
    }
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = baobab_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    baobab_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("BAOBAB")
            .and(predicate::str::contains("fetch"))
            .and(predicate::str::contains("search"))
            .and(predicate::str::contains("whoami")),
    );
}

#[test]
fn test_version_flag() {
    baobab_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("baobab"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    baobab_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    baobab_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = baobab_cmd().arg("foobar").output().unwrap();
    assert!(!output.status.success());
    let text = combined_output(&output);
    assert!(
        text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_invalid_record_kind() {
    baobab_cmd()
        .args(["fetch", "widget", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("widget"));
}

#[test]
fn test_fetch_without_server() {
    baobab_cmd()
        .args(["fetch", "place", "2"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No server configured"));
}

#[test]
fn test_logins_needs_names_or_ids() {
    baobab_cmd()
        .arg("logins")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("required"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_show_no_config() {
    baobab_cmd().args(["config", "show"]).assert().success();
}

#[test]
fn test_config_path() {
    baobab_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_then_show_redacts() {
    let home = tempfile::tempdir().unwrap();
    let home = home.path().to_str().unwrap().to_owned();

    baobab_cmd_in(&home)
        .args([
            "--server",
            "https://baobab.example.org",
            "--secret",
            "topsecret",
            "config",
            "init",
        ])
        .assert()
        .success();

    baobab_cmd_in(&home)
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default *"));

    baobab_cmd_in(&home)
        .args(["--output", "json", "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("https://baobab.example.org")
                .and(predicate::str::contains("********"))
                .and(predicate::str::contains("topsecret").not()),
        );
}

#[test]
fn test_config_use_unknown_profile() {
    baobab_cmd()
        .args(["config", "use", "nowhere"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("nowhere"));
}

// ── Against a server ────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_plugins_plain() {
    let server = mock_server(false).await;
    let mut cmd = baobab_cmd();
    cmd.args([
        "--server",
        &server.uri(),
        "--secret",
        "server-secret",
        "--output",
        "plain",
        "plugins",
    ]);

    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().collect::<Vec<_>>(), ["people", "places", "things"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_needs_login() {
    let server = mock_server(false).await;
    let mut cmd = baobab_cmd();
    cmd.args(["--server", &server.uri(), "--secret", "server-secret", "fetch", "place", "2"]);

    let output = run(cmd).await;
    assert_eq!(output.status.code(), Some(3));
    assert!(combined_output(&output).contains("needs a login"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fetch_place_as_json() {
    let server = mock_server(true).await;
    Mock::given(method("GET"))
        .and(path("/json/places/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "places": [{"id": 2, "name": "Harbour", "lang": "en", "writeable": true,
                        "latitude": 38.9, "longitude": -77.0}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut cmd = baobab_cmd();
    cmd.env("BAOBAB_PASSWORD", "pw").args([
        "--server",
        &server.uri(),
        "--secret",
        "server-secret",
        "--login-id",
        "curator",
        "--output",
        "json",
        "fetch",
        "place",
        "2",
    ]);

    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    let records: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(records[0]["id"], 2);
    assert_eq!(records[0]["kind"], "place");
    assert_eq!(records[0]["name"], "Harbour");
    assert_eq!(records[0]["latitude"], 38.9);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_whoami_plain() {
    let server = mock_server(true).await;
    let mut cmd = baobab_cmd();
    cmd.env("BAOBAB_PASSWORD", "pw").args([
        "--server",
        &server.uri(),
        "--secret",
        "server-secret",
        "--login-id",
        "curator",
        "--output",
        "plain",
        "whoami",
    ]);

    let output = run(cmd).await;
    assert!(output.status.success(), "{}", combined_output(&output));
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "curator");
}
