use std::path::Path;
use std::process::Command;

use git2::{Repository, Signature};

fn commit_files(repo: &Repository, files: &[(&str, &str)], message: &str) {
    let workdir = repo.workdir().expect("workdir");
    let mut index = repo.index().expect("open index");
    for (rel, content) in files {
        let abs = workdir.join(rel);
        if let Some(parent) = abs.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(&abs, content).expect("write file");
        index.add_path(Path::new(rel)).expect("add path");
    }
    index.write().expect("write index");
    let tree_id = index.write_tree().expect("write tree");
    let tree = repo.find_tree(tree_id).expect("find tree");
    let sig = Signature::now("Test User", "test@example.com").expect("signature");
    let parent = repo.head().ok().and_then(|h| h.peel_to_commit().ok());
    let parents: Vec<&git2::Commit> = parent.iter().collect();
    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
        .expect("commit");
}

fn fixture_workspace() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = Repository::init(dir.path()).expect("init repo");
    commit_files(
        &repo,
        &[
            ("src/app.rs", "fn main() { run(); }\n"),
            ("src/lib.rs", "pub fn run() {}\n"),
        ],
        "init",
    );
    dir
}

fn sediment(dir: &Path, args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_sediment"))
        .args(args)
        .current_dir(dir)
        .output()
        .expect("spawn sediment")
}

fn assert_success(output: &std::process::Output, what: &str) {
    assert!(
        output.status.success(),
        "{what} failed: {}",
        String::from_utf8_lossy(&output.stderr),
    );
}

#[test]
fn scan_scores_the_workspace_and_persists() {
    let dir = fixture_workspace();

    let output = sediment(dir.path(), &["scan"]);
    assert_success(&output, "scan");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Workspace debt"), "unexpected output: {stdout}");
    assert!(dir.path().join(".sediment/state.db").exists());

    // The stored result backs the file view without a new analysis.
    let output = sediment(dir.path(), &["file", "src/app.rs"]);
    assert_success(&output, "file");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("churn_rate"), "unexpected output: {stdout}");
    assert!(stdout.contains("status=none"), "unexpected output: {stdout}");
}

#[test]
fn scan_json_reports_the_full_result() {
    let dir = fixture_workspace();

    let output = sediment(dir.path(), &["scan", "--format", "json"]);
    assert_success(&output, "scan --format json");

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(value["fileCount"], 2);
    assert_eq!(value["files"].as_array().map(|f| f.len()), Some(2));
}

#[test]
fn file_without_a_stored_result_points_at_scan() {
    let dir = fixture_workspace();

    let output = sediment(dir.path(), &["file", "src/app.rs"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("sediment scan"), "unexpected stderr: {stderr}");
}

#[test]
fn ack_marks_and_clears_a_file() {
    let dir = fixture_workspace();
    assert_success(&sediment(dir.path(), &["scan"]), "scan");

    let output = sediment(dir.path(), &["ack", "src/lib.rs"]);
    assert_success(&output, "ack");
    assert!(String::from_utf8_lossy(&output.stdout).contains("Acknowledged"));

    let output = sediment(dir.path(), &["file", "src/lib.rs"]);
    assert_success(&output, "file");
    assert!(String::from_utf8_lossy(&output.stdout).contains("status=acceptable"));

    let output = sediment(dir.path(), &["ack", "src/lib.rs", "--clear"]);
    assert_success(&output, "ack --clear");
    assert!(String::from_utf8_lossy(&output.stdout).contains("Cleared"));
}

#[test]
fn snapshot_then_trend_reports_insufficient_history() {
    let dir = fixture_workspace();
    assert_success(&sediment(dir.path(), &["scan"]), "scan");

    let output = sediment(dir.path(), &["snapshot"]);
    assert_success(&output, "snapshot");
    assert!(String::from_utf8_lossy(&output.stdout).contains("Snapshot #1"));

    let output = sediment(dir.path(), &["trend"]);
    assert_success(&output, "trend");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Not enough snapshots"), "unexpected output: {stdout}");
}

#[test]
fn doctor_json_reports_environment_checks() {
    let dir = fixture_workspace();

    let output = sediment(dir.path(), &["doctor", "--format", "json"]);
    assert_success(&output, "doctor");

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let checks = value["checks"].as_array().expect("checks array");
    assert!(checks
        .iter()
        .any(|c| c["name"] == "git_repository" && c["status"] == "pass"));
    assert!(checks.iter().any(|c| c["name"] == "weights"));
    assert!(checks
        .iter()
        .any(|c| c["name"] == "language_parsers" && c["status"] == "pass"));
}
