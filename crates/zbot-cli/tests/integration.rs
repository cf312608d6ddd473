#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn zbot() -> Command {
    let mut cmd = Command::cargo_bin("zbot").unwrap();
    for var in [
        "GITHUB_APP_ID",
        "GITHUB_PRIVATE_KEY_PATH",
        "GITHUB_WEBHOOK_SECRET",
        "ZBOT_PORT",
        "GITHUB_API_URL",
        "ZBOT_RULES_REF",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

const CLOSE_RULES: &str = r#"
rules:
  - name: close on command
    event: issue_comment
    if: event.comment == "/close"
    run: closeIssue()
  - name: nightly
    event: schedule
    run: label("stale")
"#;

fn rules_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("close.yaml"), CLOSE_RULES).unwrap();
    dir
}

fn write_payload(dir: &TempDir, comment: &str) -> std::path::PathBuf {
    let payload = serde_json::json!({
        "action": "created",
        "issue": { "number": 3, "labels": [] },
        "comment": { "body": comment, "user": { "login": "alice" } },
        "repository": { "name": "hello", "owner": { "login": "octo" } }
    });
    let path = dir.path().join("payload.json");
    std::fs::write(&path, payload.to_string()).unwrap();
    path
}

// ---------------------------------------------------------------------------
// zbot check
// ---------------------------------------------------------------------------

#[test]
fn check_lists_rules() {
    let dir = rules_dir();
    zbot()
        .arg("check")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("close on command"))
        .stdout(predicate::str::contains("issue_comment"))
        .stdout(predicate::str::contains("nightly"));
}

#[test]
fn check_finds_nested_rules_directory() {
    let dir = TempDir::new().unwrap();
    let nested = dir.path().join(".github/zbot");
    std::fs::create_dir_all(&nested).unwrap();
    std::fs::write(nested.join("close.yml"), CLOSE_RULES).unwrap();

    zbot()
        .arg("check")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("close on command"));
}

#[test]
fn check_fails_on_invalid_yaml() {
    let dir = rules_dir();
    std::fs::write(dir.path().join("broken.yaml"), "rules: [ {").unwrap();

    zbot()
        .arg("check")
        .arg(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("close on command"))
        .stderr(predicate::str::contains("broken.yaml"));
}

#[test]
fn check_fails_on_script_syntax_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("r.yaml"),
        "rules:\n  - name: typo\n    event: issues\n    run: label(\n",
    )
    .unwrap();

    zbot()
        .arg("check")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("typo"));
}

#[test]
fn check_json_output() {
    let dir = rules_dir();
    let out = zbot()
        .args(["check", "--json"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(out.status.success());

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["rules"].as_array().unwrap().len(), 2);
    assert_eq!(json["rules"][0]["if"], "event.comment == \"/close\"");
    assert_eq!(json["rules"][1]["run"], "label(\"stale\")");
    assert!(json["problems"].as_array().unwrap().is_empty());
}

#[test]
fn check_rejects_missing_directory() {
    let dir = TempDir::new().unwrap();
    zbot()
        .arg("check")
        .arg(dir.path().join("nope"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a directory"));
}

// ---------------------------------------------------------------------------
// zbot simulate
// ---------------------------------------------------------------------------

#[test]
fn simulate_runs_matching_rule() {
    let dir = rules_dir();
    let payload = write_payload(&dir, "/close");

    zbot()
        .args(["simulate", "--event", "issue_comment", "--rules"])
        .arg(dir.path())
        .arg("--payload")
        .arg(&payload)
        .assert()
        .success()
        .stdout(predicate::str::contains("executed"))
        .stdout(predicate::str::contains("closeIssue()"));
}

#[test]
fn simulate_reports_false_guard() {
    let dir = rules_dir();
    let payload = write_payload(&dir, "hello");

    let out = zbot()
        .args(["simulate", "--json", "--event", "issue_comment", "--rules"])
        .arg(dir.path())
        .arg("--payload")
        .arg(&payload)
        .output()
        .unwrap();
    assert!(out.status.success());

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["event"], "issue_comment");
    let outcomes = json["report"]["outcomes"].as_array().unwrap();
    assert_eq!(outcomes[0]["rule"], "close on command");
    assert_eq!(outcomes[0]["status"], "skipped");
    assert_eq!(outcomes[0]["reason"], "guard_false");
    assert_eq!(outcomes[1]["status"], "unmatched");
}

#[test]
fn simulate_schedule_tick() {
    let dir = rules_dir();

    let out = zbot()
        .args(["simulate", "--json", "--event", "schedule", "--rules"])
        .arg(dir.path())
        .output()
        .unwrap();
    assert!(out.status.success());

    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let outcomes = json["report"]["outcomes"].as_array().unwrap();
    assert_eq!(outcomes[0]["status"], "unmatched");
    assert_eq!(outcomes[1]["status"], "executed");
    assert_eq!(outcomes[1]["invoked"][0]["capability"], "label");
}

#[test]
fn simulate_rejects_invalid_payload() {
    let dir = rules_dir();
    let payload = dir.path().join("payload.json");
    std::fs::write(&payload, "{nope").unwrap();

    zbot()
        .args(["simulate", "--event", "issue_comment", "--rules"])
        .arg(dir.path())
        .arg("--payload")
        .arg(&payload)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not valid JSON"));
}

// ---------------------------------------------------------------------------
// zbot serve
// ---------------------------------------------------------------------------

#[test]
fn serve_requires_app_id() {
    zbot()
        .arg("serve")
        .assert()
        .failure()
        .stderr(predicate::str::contains("GITHUB_APP_ID"));
}

#[test]
fn serve_rejects_unreadable_key() {
    let dir = TempDir::new().unwrap();
    zbot()
        .arg("serve")
        .env("GITHUB_APP_ID", "1")
        .env("GITHUB_PRIVATE_KEY_PATH", dir.path().join("missing.pem"))
        .env("GITHUB_WEBHOOK_SECRET", "s3cret")
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot read private key"));
}
