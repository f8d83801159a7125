//! Import/export bundle tests for the kcal binary.
//!
//! Covers the reconciliation flow end to end: full roundtrips, duplicate
//! skipping, partial-failure semantics, and setup-level failures.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("kcal"))
}

/// Populate a data dir with a meal, a check-in and a goal
fn populate(data_dir: &Path) {
    cli()
        .args(["meal", "add"])
        .args(["--name", "Oatmeal"])
        .args(["--calories", "200"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    cli()
        .args(["eat", "Oatmeal"])
        .args(["--servings", "1.5"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();

    cli()
        .args(["goal", "set"])
        .args(["--calories", "2200"])
        .arg("--data-dir")
        .arg(data_dir)
        .assert()
        .success();
}

#[test]
fn test_export_writes_bundle_files() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    let bundle = temp_dir.path().join("bundle");
    populate(&data_dir);

    cli()
        .arg("export")
        .arg(&bundle)
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Exported"));

    for table in ["exercises", "meals", "goal", "pieces", "check_ins"] {
        assert!(bundle.join(format!("{}.csv", table)).exists());
    }
    assert!(bundle.join("manifest.json").exists());
}

#[test]
fn test_roundtrip_into_fresh_data_dir() {
    let temp_dir = setup_test_dir();
    let source = temp_dir.path().join("src");
    let target = temp_dir.path().join("dst");
    let bundle = temp_dir.path().join("bundle");
    populate(&source);

    cli()
        .arg("export")
        .arg(&bundle)
        .arg("--data-dir")
        .arg(&source)
        .assert()
        .success();

    cli()
        .arg("import")
        .arg(&bundle)
        .arg("--data-dir")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("0 failed"));

    // Imported meal and goal are live in the target store
    cli()
        .args(["meal", "list"])
        .arg("--data-dir")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Oatmeal"));

    cli()
        .args(["goal", "show"])
        .arg("--data-dir")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("2200"));

    // Derived total recomputed on import: 200 * 1.5 = 300
    let journal = fs::read_to_string(target.join("check_ins.jsonl")).unwrap();
    assert!(journal.contains("\"total_calories\":300"));
}

#[test]
fn test_reimport_skips_existing_records() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    let bundle = temp_dir.path().join("bundle");
    populate(&data_dir);

    cli()
        .arg("export")
        .arg(&bundle)
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    cli()
        .arg("import")
        .arg(&bundle)
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("skipped"));

    // The journal did not grow a duplicate check-in
    let journal = fs::read_to_string(data_dir.join("check_ins.jsonl")).unwrap();
    assert_eq!(journal.lines().count(), 1);
}

#[test]
fn test_bad_row_reported_but_batch_succeeds() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    let bundle = temp_dir.path().join("bundle");
    populate(&data_dir);

    cli()
        .arg("export")
        .arg(&bundle)
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();

    // Corrupt one meal row: blank out the name (a required field)
    let meals_path = bundle.join("meals.csv");
    let contents = fs::read_to_string(&meals_path).unwrap();
    let corrupted = contents.replace("Oatmeal", "");
    fs::write(&meals_path, corrupted).unwrap();

    let target = temp_dir.path().join("dst");
    cli()
        .arg("import")
        .arg(&bundle)
        .arg("--data-dir")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::contains("Errors:"))
        .stdout(predicate::str::contains("meals row 1"));
}

#[test]
fn test_missing_manifest_fails_import() {
    let temp_dir = setup_test_dir();
    let bundle = temp_dir.path().join("bundle");
    fs::create_dir_all(&bundle).unwrap();

    cli()
        .arg("import")
        .arg(&bundle)
        .arg("--data-dir")
        .arg(temp_dir.path().join("data"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("import failed during setup"));
}

#[test]
fn test_corrupted_journal_line_is_tolerated() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().join("data");
    populate(&data_dir);

    // Garbage line in the journal must not break exports or progress
    let journal_path = data_dir.join("check_ins.jsonl");
    let mut contents = fs::read_to_string(&journal_path).unwrap();
    contents.push_str("{ not json\n");
    fs::write(&journal_path, contents).unwrap();

    cli()
        .args(["progress", "--days", "1"])
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Consumed: 300 kcal"));

    let bundle = temp_dir.path().join("bundle");
    cli()
        .arg("export")
        .arg(&bundle)
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success();
}
