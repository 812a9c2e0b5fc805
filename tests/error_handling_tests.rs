//! Fatal-path behavior: validation failures and cleanup of partial
//! destinations

mod common;

use std::fs;

use common::CloneFixture;
use predicates::prelude::*;

#[test]
fn test_missing_local_source_is_fatal() {
    let fixture = CloneFixture::new();

    fixture
        .cmd()
        .args(["no-such-repo", "dst"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not exist"));

    assert!(!fixture.path.join("dst").exists());
}

#[test]
fn test_nonempty_destination_is_fatal() {
    let fixture = CloneFixture::new();
    let src = fixture.create_source_repo("src");
    let dest = fixture.path.join("dst");
    fs::create_dir(&dest).unwrap();
    fs::write(dest.join("occupied"), b"x").unwrap();

    fixture
        .cmd()
        .args([src.to_str().unwrap(), dest.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert!(dest.join("occupied").exists(), "existing content untouched");
}

#[test]
fn test_failed_transport_cleans_up_destination() {
    let fixture = CloneFixture::new();
    let dest = fixture.path.join("dst");

    fixture
        .cmd()
        .args(["file:///no/such/repository.git", dest.to_str().unwrap()])
        .assert()
        .failure();

    assert!(
        !dest.exists(),
        "a failed clone must remove the destination it created"
    );
}

#[test]
fn test_missing_branch_cleans_up_destination() {
    let fixture = CloneFixture::new();
    let src = fixture.create_source_repo("src");
    let dest = fixture.path.join("dst");

    fixture
        .cmd()
        .args([
            "--branch",
            "does-not-exist",
            src.to_str().unwrap(),
            dest.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found in upstream"));

    assert!(!dest.exists());
}

#[test]
fn test_option_conflicts_rejected() {
    let fixture = CloneFixture::new();

    fixture
        .cmd()
        .args(["--bare", "--origin", "up", "src"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("incompatible"));

    fixture
        .cmd()
        .args(["--bare", "--separate-git-dir", "meta", "src"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("incompatible"));

    fixture
        .cmd()
        .args(["--depth", "0", "src"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a positive number"));
}

#[test]
fn test_unguessable_destination_rejected() {
    let fixture = CloneFixture::new();

    fixture
        .cmd()
        .arg("https://")
        .assert()
        .failure()
        .stderr(predicate::str::contains("could be guessed"));
}

#[test]
fn test_bundle_source_reports_unsupported_transport() {
    let fixture = CloneFixture::new();
    let bundle = fixture.path.join("snapshot.bundle");
    fs::write(&bundle, b"not a real bundle").unwrap();
    let dest = fixture.path.join("dst");

    fixture
        .cmd()
        .args([bundle.to_str().unwrap(), dest.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("know how to clone"));

    assert!(!dest.exists(), "failed bundle clone cleans up");
}
