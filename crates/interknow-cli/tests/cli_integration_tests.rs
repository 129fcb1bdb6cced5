//! CLI integration tests for interknow
//!
//! Tests the interknow CLI commands end-to-end using assert_cmd. Every test
//! points the config directory at a temp dir so nothing touches the user's
//! real configuration or database.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command isolated in its own config dir with no credentials
#[allow(deprecated)]
fn interknow_cmd(config_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("interknow").unwrap();
    cmd.current_dir(config_dir.path());
    cmd.env("INTERKNOW_CONFIG_DIR", config_dir.path());
    cmd.env_remove("INTERKNOW_API_KEY");
    cmd.env_remove("VOLC_ARK_API_KEY");
    cmd.env_remove("VOLC_ARK_MODEL");
    cmd.env("RUST_LOG", "off");
    cmd
}

#[test]
fn test_config_list_shows_sections() {
    let dir = TempDir::new().unwrap();

    interknow_cmd(&dir)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("generation.max_nodes = 30"))
        .stdout(predicate::str::contains("quality.min_valid_links = 6"))
        .stdout(predicate::str::contains("filter.false_positive_rate = 0.01"));
}

#[test]
fn test_config_set_then_get() {
    let dir = TempDir::new().unwrap();

    interknow_cmd(&dir)
        .args(["config", "set", "quality.min_disciplines", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Set quality.min_disciplines = 4"));

    assert!(dir.path().join("config.toml").exists());

    interknow_cmd(&dir)
        .args(["config", "get", "quality.min_disciplines"])
        .assert()
        .success()
        .stdout(predicate::str::diff("4\n"));
}

#[test]
fn test_config_rejects_api_key() {
    let dir = TempDir::new().unwrap();

    interknow_cmd(&dir)
        .args(["config", "set", "llm.api_key", "secret"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("environment variable"));
}

#[test]
fn test_config_reset_removes_file() {
    let dir = TempDir::new().unwrap();

    interknow_cmd(&dir)
        .args(["config", "set", "generation.max_links", "40"])
        .assert()
        .success();

    interknow_cmd(&dir).args(["config", "reset"]).assert().success();
    assert!(!dir.path().join("config.toml").exists());
}

#[test]
fn test_usage_starts_at_zero() {
    let dir = TempDir::new().unwrap();

    interknow_cmd(&dir)
        .args(["usage", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"total_tokens\":0"))
        .stdout(predicate::str::contains("\"total_counts\":0"));
}

#[test]
fn test_resolve_without_api_key_fails() {
    let dir = TempDir::new().unwrap();

    interknow_cmd(&dir)
        .args(["resolve", "熵", "--memory"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key found"))
        .stderr(predicate::str::contains("Try: interknow doctor"));
}

#[test]
fn test_resolve_blank_concept_returns_warning() {
    let dir = TempDir::new().unwrap();

    interknow_cmd(&dir)
        .env("VOLC_ARK_API_KEY", "test-key")
        .args(["resolve", "   ", "--memory", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"warnings\":[\"empty concept\"]"))
        .stdout(predicate::str::contains("\"tokens\":0"));
}

#[test]
fn test_chat_rejects_empty_message() {
    let dir = TempDir::new().unwrap();

    interknow_cmd(&dir)
        .env("VOLC_ARK_API_KEY", "test-key")
        .args(["chat", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty message"));
}

#[test]
fn test_chat_rejects_malformed_history() {
    let dir = TempDir::new().unwrap();
    let history = dir.path().join("turns.json");
    std::fs::write(&history, "{not a list").unwrap();

    interknow_cmd(&dir)
        .env("VOLC_ARK_API_KEY", "test-key")
        .args(["chat", "熵是什么？", "--history"])
        .arg(&history)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid history file"));
}

#[test]
fn test_doctor_reports_missing_key() {
    let dir = TempDir::new().unwrap();

    interknow_cmd(&dir)
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("[!!] API Key"))
        .stdout(predicate::str::contains("[OK] Database"));
}
