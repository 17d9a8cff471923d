//! Integration tests for the `nebularr` CLI binary.
//!
//! Argument parsing, completions and error exit codes run without any
//! service. End-to-end runs use the file backend or a wiremock server.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `nebularr` binary with env isolation.
///
/// Clears the `NEBULARR_*` env vars and points config directories at a
/// nonexistent path so tests never touch the user's real configuration.
fn nebularr_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("nebularr");
    cmd.env("HOME", "/tmp/nebularr-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/nebularr-cli-test-nonexistent")
        .env("XDG_DATA_HOME", "/tmp/nebularr-cli-test-nonexistent")
        .env_remove("NEBULARR_CONFIG")
        .env_remove("NEBULARR_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// A workspace with one file-backed instance `rendered`.
struct FileSetup {
    dir: TempDir,
    config: PathBuf,
}

impl FileSetup {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("desired.yaml"),
            "\
downloadClients:
  - name: qbittorrent-main
    implementation: QBittorrent
    priority: 1
    fields:
      host: qbit.lan
      port: 8080
",
        )
        .unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(
            &config,
            format!(
                r#"
status_dir = "status"

[instances.rendered]
backend = "file"
url = "file://{}"
desired = "desired.yaml"
"#,
                dir.path().join("rendered.yaml").display()
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn cmd(&self) -> assert_cmd::Command {
        let mut cmd = nebularr_cmd();
        cmd.arg("--config").arg(&self.config).args(["--color", "never"]);
        cmd
    }
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let config = dir.join("config.toml");
    std::fs::write(&config, body).unwrap();
    config
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = nebularr_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    nebularr_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("Radarr")
            .and(predicate::str::contains("reconcile"))
            .and(predicate::str::contains("diff"))
            .and(predicate::str::contains("status")),
    );
}

#[test]
fn test_version_flag() {
    nebularr_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("nebularr"));
}

#[test]
fn test_invalid_output_format() {
    nebularr_cmd()
        .args(["--output", "xml", "status"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("xml"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    nebularr_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("nebularr"));
}

#[test]
fn test_completions_zsh() {
    nebularr_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Configuration errors ────────────────────────────────────────────

#[test]
fn test_status_without_instances() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), "[defaults]\nperiod = 60\n");
    let output = nebularr_cmd()
        .arg("--config")
        .arg(&config)
        .arg("status")
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = combined_output(&output);
    assert!(
        text.contains("No instances configured"),
        "Expected no-instances error:\n{text}"
    );
}

#[test]
fn test_unknown_instance_lists_configured() {
    let setup = FileSetup::new();
    let output = setup.cmd().args(["diff", "films"]).output().unwrap();
    assert_eq!(output.status.code(), Some(4));
    let text = combined_output(&output);
    assert!(text.contains("films"), "Expected instance name:\n{text}");
    assert!(text.contains("rendered"), "Expected alternatives:\n{text}");
}

#[test]
fn test_missing_api_key_exits_with_auth_code() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        r#"
[instances.nebularr-cli-test-keyless]
backend = "radarr"
url = "http://127.0.0.1:9"
"#,
    );
    let output = nebularr_cmd()
        .arg("--config")
        .arg(&config)
        .args(["health", "nebularr-cli-test-keyless"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
}

// ── File backend end to end ─────────────────────────────────────────

#[test]
fn test_diff_before_reconcile_lists_creates() {
    let setup = FileSetup::new();
    setup
        .cmd()
        .args(["--output", "plain", "diff", "rendered"])
        .assert()
        .success()
        .stdout(predicate::str::contains("+ download-client").and(predicate::str::contains("qbittorrent-main")));
    assert!(!setup.path("rendered.yaml").exists());
}

#[test]
fn test_reconcile_renders_file_and_records_status() {
    let setup = FileSetup::new();
    setup
        .cmd()
        .args(["reconcile", "rendered"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Ready"));

    let rendered = std::fs::read_to_string(setup.path("rendered.yaml")).unwrap();
    assert!(rendered.contains("qbittorrent-main"));

    let status: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(setup.path("status/rendered.json")).unwrap())
            .unwrap();
    assert_eq!(status["phase"], "Ready");
    assert_eq!(status["observedGeneration"], 1);
    assert!(status["lastAppliedHash"].is_string());

    setup
        .cmd()
        .args(["diff", "rendered"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No changes: in sync"));

    let output = setup
        .cmd()
        .args(["--output", "json", "fingerprint", "rendered"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let fingerprint: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(fingerprint["inSync"], true);
    assert_eq!(fingerprint["fingerprint"], status["lastAppliedHash"]);
}

#[test]
fn test_status_shows_recorded_phase() {
    let setup = FileSetup::new();
    setup.cmd().args(["-q", "reconcile"]).assert().success().stdout("");

    setup
        .cmd()
        .args(["--output", "plain", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rendered\tReady\tTrue"));

    setup
        .cmd()
        .args(["status", "rendered"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Generation:      1").and(predicate::str::contains("Connected")));
}

#[test]
fn test_fingerprint_is_stable_and_out_of_sync_before_reconcile() {
    let setup = FileSetup::new();
    let first = setup
        .cmd()
        .args(["--output", "plain", "fingerprint", "rendered"])
        .output()
        .unwrap();
    let second = setup
        .cmd()
        .args(["--output", "plain", "fingerprint", "rendered"])
        .output()
        .unwrap();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
    assert!(!first.stdout.is_empty());

    setup
        .cmd()
        .args(["fingerprint", "rendered"])
        .assert()
        .success()
        .stdout(predicate::str::contains("In sync:       no"));
}

#[test]
fn test_reconcile_failure_exits_not_reconciled() {
    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            r#"
status_dir = "status"

[instances.orphan]
backend = "file"
url = "file://{}"
"#,
            dir.path().join("missing-dir/rendered.yaml").display()
        ),
    );
    let output = nebularr_cmd()
        .arg("--config")
        .arg(&config)
        .args(["--color", "never", "reconcile"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(10));
    let text = combined_output(&output);
    assert!(text.contains("Failed"), "Expected failed phase:\n{text}");
    assert!(dir.path().join("status/orphan.json").exists());
}

#[test]
fn test_health_on_file_backend_is_unsupported() {
    let setup = FileSetup::new();
    setup.cmd().args(["health", "rendered"]).assert().code(5);
}

// ── Servarr backend ─────────────────────────────────────────────────

#[tokio::test]
async fn test_health_lists_service_issues() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v3/health"))
        .and(header("X-Api-Key", "cli-test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "source": "IndexerStatusCheck", "type": "warning", "message": "Indexers unavailable" },
            { "source": "DownloadClientCheck", "type": "error", "message": "Unable to reach qBittorrent" }
        ])))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            r#"
[instances.nebularr-cli-test-movies]
backend = "radarr"
url = "{}"
api_key = "cli-test-key"
"#,
            server.uri()
        ),
    );

    let output = tokio::task::spawn_blocking(move || {
        nebularr_cmd()
            .arg("--config")
            .arg(&config)
            .args(["--output", "json", "health", "nebularr-cli-test-movies"])
            .output()
            .unwrap()
    })
    .await
    .unwrap();

    assert!(output.status.success(), "{}", combined_output(&output));
    let health: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(health["healthy"], false);
    assert_eq!(health["issues"].as_array().unwrap().len(), 2);
    assert_eq!(health["issues"][1]["severity"], "error");
}
