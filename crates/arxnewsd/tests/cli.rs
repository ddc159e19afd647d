//! Integration tests for the arxnewsd CLI commands.
//!
//! Only offline commands are exercised here; everything network-facing is
//! covered by the library's harvest tests against a canned server. Tests run
//! in serial to avoid database conflicts.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::tempdir;

// Helper function to create a clean command instance
fn arxnewsd() -> Command { Command::cargo_bin("arxnewsd").unwrap() }

// Helper to get a temporary database path
fn temp_db() -> (tempfile::TempDir, PathBuf) {
  let dir = tempdir().unwrap();
  let db_path = dir.path().join("test.db");
  (dir, db_path)
}

#[test]
#[serial]
fn test_init_and_clean() {
  let (dir, db_path) = temp_db();

  // Initialize database
  arxnewsd()
    .arg("init")
    .arg("--path")
    .arg(&db_path)
    .arg("--accept-defaults")
    .assert()
    .success()
    .stdout(predicate::str::contains("initialized successfully"));

  assert!(db_path.exists());

  // Clean with force flag
  arxnewsd()
    .arg("clean")
    .arg("--path")
    .arg(&db_path)
    .arg("--accept-defaults")
    .assert()
    .success()
    .stdout(predicate::str::contains("Database files cleaned"));

  assert!(!db_path.exists());
  dir.close().unwrap();
}

#[test]
#[serial]
fn test_reinit_with_accept_defaults() {
  let (dir, db_path) = temp_db();

  arxnewsd().arg("init").arg("--path").arg(&db_path).arg("--accept-defaults").assert().success();

  // A second init must not hang on a prompt when defaults are accepted.
  arxnewsd()
    .arg("init")
    .arg("--path")
    .arg(&db_path)
    .arg("--accept-defaults")
    .assert()
    .success()
    .stdout(predicate::str::contains("Removing existing database"))
    .stdout(predicate::str::contains("initialized successfully"));

  dir.close().unwrap();
}

#[test]
#[serial]
fn test_clean_missing_database() {
  let (dir, db_path) = temp_db();

  arxnewsd()
    .arg("clean")
    .arg("--path")
    .arg(&db_path)
    .arg("--accept-defaults")
    .assert()
    .success()
    .stdout(predicate::str::contains("No database found"));

  dir.close().unwrap();
}

#[test]
#[serial]
fn test_list_empty_database() {
  let (dir, db_path) = temp_db();

  arxnewsd().arg("init").arg("--path").arg(&db_path).arg("--accept-defaults").assert().success();

  arxnewsd()
    .arg("list")
    .arg("--path")
    .arg(&db_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("No papers to show"));

  dir.close().unwrap();
}

#[test]
#[serial]
fn test_list_rejects_unknown_state() {
  let (dir, db_path) = temp_db();

  arxnewsd()
    .arg("list")
    .arg("--path")
    .arg(&db_path)
    .arg("--state")
    .arg("starred")
    .assert()
    .failure();

  dir.close().unwrap();
}

#[test]
#[serial]
fn test_search_empty_database() {
  let (dir, db_path) = temp_db();

  arxnewsd().arg("init").arg("--path").arg(&db_path).arg("--accept-defaults").assert().success();

  arxnewsd()
    .arg("search")
    .arg("ThisPaperDoesNotExist123")
    .arg("--path")
    .arg(&db_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("No papers found"));

  dir.close().unwrap();
}

#[test]
#[serial]
fn test_keep_unknown_paper() {
  let (dir, db_path) = temp_db();

  arxnewsd().arg("init").arg("--path").arg(&db_path).arg("--accept-defaults").assert().success();

  arxnewsd()
    .arg("keep")
    .arg("2501.99999")
    .arg("--path")
    .arg(&db_path)
    .assert()
    .success()
    .stdout(predicate::str::contains("No stored paper"));

  dir.close().unwrap();
}

#[test]
#[serial]
fn test_digest_renders_header() {
  let (dir, db_path) = temp_db();

  arxnewsd().arg("init").arg("--path").arg(&db_path).arg("--accept-defaults").assert().success();

  arxnewsd()
    .arg("digest")
    .arg("--path")
    .arg(&db_path)
    .arg("--date")
    .arg("2025-01-06")
    .assert()
    .success()
    .stdout(predicate::str::contains("# arXiv Daily Digest — 2025-01-06"));

  dir.close().unwrap();
}
