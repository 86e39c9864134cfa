//! CLI integration tests
//!
//! These tests run the compiled `commitview` binary directly against a
//! scratch index root and a scratch git repository.

use git2::{Repository, Signature, Time};
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn bin(root: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_commitview"));
    command
        .env("NO_COLOR", "1")
        .arg("--index-root")
        .arg(root)
        .arg("--log-level")
        .arg("error");
    command
}

fn run(root: &Path, args: &[&str]) -> Output {
    bin(root).args(args).output().expect("failed to run binary")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Source repository with one commit on master
fn source_repository(dir: &Path, message: &str) -> String {
    let repo = Repository::init(dir).unwrap();
    let blob = repo.blob(b"hello\n").unwrap();
    let mut builder = repo.treebuilder(None).unwrap();
    builder.insert("hello.txt", blob, 0o100644).unwrap();
    let tree = repo.find_tree(builder.write().unwrap()).unwrap();
    let sig = Signature::new("Jane Doe", "jane@example.com", &Time::new(1_600_000_000, 0)).unwrap();
    let oid = repo
        .commit(Some("refs/heads/master"), &sig, &sig, message, &tree, &[])
        .unwrap();
    oid.to_string()
}

// ── help / version ────────────────────────────────────────────────────────────

#[test]
fn test_help_exits_zero() {
    let status = Command::new(env!("CARGO_BIN_EXE_commitview"))
        .arg("--help")
        .status()
        .expect("failed to run binary");
    assert!(status.success(), "--help should exit 0");
}

#[test]
fn test_version_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_commitview"))
        .arg("--version")
        .output()
        .expect("failed to run binary");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("commitview"),
        "version output should contain binary name, got: {}",
        stdout
    );
}

// ── empty index root ──────────────────────────────────────────────────────────

#[test]
fn test_stats_on_empty_root() {
    let tmp = TempDir::new().unwrap();
    let output = run(tmp.path(), &["stats"]);
    assert!(output.status.success(), "stats on empty root should exit 0");
    assert!(stdout(&output).contains("Repositories"));
}

#[test]
fn test_list_on_empty_root() {
    let tmp = TempDir::new().unwrap();
    let output = run(tmp.path(), &["list"]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("No repositories registered"));
}

#[test]
fn test_unknown_repository_fails() {
    let tmp = TempDir::new().unwrap();
    let output = run(tmp.path(), &["remove", "nope"]);
    assert!(!output.status.success());
}

// ── end to end ────────────────────────────────────────────────────────────────

#[test]
fn test_add_index_and_query_issue() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("root");
    let source = tmp.path().join("source");
    let hash = source_repository(&source, "GCV-1 say hello");
    let uri = format!("file://{}", source.display());

    let added = run(&root, &["add", "fixture", &uri]);
    assert!(added.status.success(), "add failed: {:?}", added);

    let listed = stdout(&run(&root, &["list"]));
    assert!(listed.contains("fixture"), "got: {}", listed);
    assert!(listed.contains("yes"), "repository should be active, got: {}", listed);

    let indexed = run(&root, &["index"]);
    assert!(indexed.status.success(), "index failed: {:?}", indexed);

    let found = stdout(&run(&root, &["issue", "gcv-1", "--files"]));
    assert!(found.contains(&hash[..7]), "got: {}", found);
    assert!(found.contains("master"), "got: {}", found);
    assert!(found.contains("A hello.txt"), "got: {}", found);

    let missing = stdout(&run(&root, &["issue", "GCV-2"]));
    assert!(missing.contains("No commits found"), "got: {}", missing);

    let project = stdout(&run(&root, &["project", "GCV"]));
    assert!(project.contains(&hash[..7]), "got: {}", project);

    let removed = run(&root, &["remove", "fixture"]);
    assert!(removed.status.success());
    let after = stdout(&run(&root, &["issue", "GCV-1"]));
    assert!(after.contains("No commits found"), "got: {}", after);
}
