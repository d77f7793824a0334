//! CLI integration tests for the brig command-line interface.
//!
//! Each test points `BRIGADE_CONFIG_DIR` at a fresh temp directory so the
//! user's real configuration is never read or written.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Get a command for the brig binary with an isolated config directory.
fn brig(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("brig").unwrap();
    cmd.env("BRIGADE_CONFIG_DIR", config_dir.path())
        .env_remove("BRIGADE_SERVER")
        .env_remove("BRIGADE_TOKEN")
        .env_remove("BRIGADE_ROOT_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

// ─────────────────────────────────────────────────────────────────────────────
// Help and Version Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_help_lists_subcommands() {
    let dir = TempDir::new().unwrap();
    brig(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("logout"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("context"));
}

#[test]
fn test_version_displays() {
    let dir = TempDir::new().unwrap();
    brig(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("brig"));
}

#[test]
fn test_password_requires_root() {
    let dir = TempDir::new().unwrap();
    brig(&dir)
        .args(["login", "--password", "foobar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--root"));
}

#[test]
fn test_malformed_query_rejected() {
    let dir = TempDir::new().unwrap();
    brig(&dir)
        .args(["get", "v2/projects", "-q", "novalue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("key=value"));
}

// ─────────────────────────────────────────────────────────────────────────────
// Context Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_context_list_empty() {
    let dir = TempDir::new().unwrap();
    brig(&dir)
        .args(["context", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No contexts configured"));
}

#[test]
fn test_first_context_becomes_current() {
    let dir = TempDir::new().unwrap();
    brig(&dir)
        .args(["context", "set", "local", "--server", "https://localhost:7000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Context \"local\" created."))
        .stdout(predicate::str::contains("set as current context"));

    brig(&dir)
        .args(["context", "current"])
        .assert()
        .success()
        .stdout("local\n");

    assert!(dir.path().join("client.yaml").exists());
}

#[test]
fn test_context_use_switches_current() {
    let dir = TempDir::new().unwrap();
    brig(&dir)
        .args(["context", "set", "local", "--server", "https://localhost:7000"])
        .assert()
        .success();
    brig(&dir)
        .args(["context", "set", "prod", "--server", "https://brigade.example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("set as current").not());

    brig(&dir).args(["context", "use", "prod"]).assert().success();

    brig(&dir)
        .args(["context", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("*         prod"));
}

#[test]
fn test_context_set_requires_server_for_new_context() {
    let dir = TempDir::new().unwrap();
    brig(&dir)
        .args(["context", "set", "local"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--server is required"));
}

#[test]
fn test_context_use_unknown_fails() {
    let dir = TempDir::new().unwrap();
    brig(&dir)
        .args(["context", "use", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere"));
}

#[test]
fn test_context_delete() {
    let dir = TempDir::new().unwrap();
    brig(&dir)
        .args(["context", "set", "local", "--server", "https://localhost:7000"])
        .assert()
        .success();
    brig(&dir)
        .args(["context", "delete", "local"])
        .assert()
        .success();
    brig(&dir)
        .args(["context", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No contexts configured"));
}

// ─────────────────────────────────────────────────────────────────────────────
// API Command Tests
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_get_without_server_fails() {
    let dir = TempDir::new().unwrap();
    brig(&dir)
        .args(["get", "v2/projects"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no API server configured"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_against_server() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/projects"))
        .and(query_param("limit", "2"))
        .and(header("authorization", "Bearer t0k3n"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "metadata": {},
            "items": [{ "metadata": { "id": "italian" } }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let dir = TempDir::new().unwrap();
    let mut cmd = brig(&dir);
    tokio::task::spawn_blocking(move || {
        cmd.args([
            "--server", uri.as_str(), "--token", "t0k3n", "--json", "get", "v2/projects", "--limit", "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"italian\""));
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_get_reports_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/projects/bluebook"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "type": "Project",
            "id": "bluebook"
        })))
        .mount(&server)
        .await;

    let uri = server.uri();
    let dir = TempDir::new().unwrap();
    let mut cmd = brig(&dir);
    tokio::task::spawn_blocking(move || {
        cmd.args(["--server", uri.as_str(), "get", "v2/projects/bluebook"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Project \"bluebook\" not found."));
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_prints_events_until_done() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/events/123/worker/status"))
        .and(query_param("watch", "true"))
        .and(query_param("sse", "true"))
        .and(header("authorization", "Bearer t0k3n"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "data: {\"phase\":\"RUNNING\"}\n\ndata: {\"phase\":\"SUCCEEDED\"}\n\nevent: done\ndata: {}\n\n",
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let dir = TempDir::new().unwrap();
    let mut cmd = brig(&dir);
    tokio::task::spawn_blocking(move || {
        cmd.args([
            "--server",
            uri.as_str(),
            "--token",
            "t0k3n",
            "watch",
            "v2/events/123/worker/status",
            "-q",
            "watch=true",
            "-q",
            "sse=true",
        ])
        .assert()
        .success()
        .stdout("{\"phase\":\"RUNNING\"}\n{\"phase\":\"SUCCEEDED\"}\n");
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_watch_fails_on_refused_stream() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/events/123/logs"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let uri = server.uri();
    let dir = TempDir::new().unwrap();
    let mut cmd = brig(&dir);
    tokio::task::spawn_blocking(move || {
        cmd.args(["--server", uri.as_str(), "watch", "v2/events/123/logs"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("received 403 from the API server"));
    })
    .await
    .unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_root_login_stores_token_in_context() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/sessions"))
        .and(query_param("root", "true"))
        .and(header("authorization", "Basic cm9vdDpmb29iYXI="))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "value": "s3cr3t"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/projects"))
        .and(header("authorization", "Bearer s3cr3t"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "metadata": {},
            "items": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let uri = server.uri();
    let dir = TempDir::new().unwrap();
    tokio::task::spawn_blocking(move || {
        brig(&dir)
            .args(["context", "set", "local", "--server", uri.as_str()])
            .assert()
            .success();

        brig(&dir)
            .args(["login", "--root", "--password", "foobar"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Logged in as root."))
            .stdout(predicate::str::contains("Token stored in context \"local\"."));

        let saved = std::fs::read_to_string(dir.path().join("client.yaml")).unwrap();
        assert!(saved.contains("s3cr3t"));

        // The stored token is used by later commands
        brig(&dir).args(["get", "v2/projects"]).assert().success();
    })
    .await
    .unwrap();
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_unwritable_log_dir_falls_back_to_stderr() {
    let dir = TempDir::new().unwrap();
    let not_a_dir = dir.path().join("config");
    std::fs::write(&not_a_dir, "").unwrap();

    Command::cargo_bin("brig")
        .unwrap()
        .env("BRIGADE_CONFIG_DIR", &not_a_dir)
        .env_remove("RUST_LOG")
        .args(["context", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No contexts configured"))
        .stderr(predicate::str::contains("File logging disabled"));
}
