//! CLI integration tests for ukbuild.
//!
//! These run the binary against throwaway projects and a local catalog,
//! with the global home directory redirected into a temporary directory.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the ukbuild binary command with its home inside `tmp`.
fn ukbuild(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ukbuild").unwrap();
    cmd.env("UKBUILD_HOME", tmp.path().join("home"));
    cmd
}

/// Create a project directory with the given manifest.
fn project(tmp: &TempDir, manifest: &str) -> std::path::PathBuf {
    let dir = tmp.path().join("project");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("Kraftfile.toml"), manifest).unwrap();
    dir
}

/// Create a local catalog holding a core and one library.
fn catalog(tmp: &TempDir) -> std::path::PathBuf {
    let root = tmp.path().join("catalog");
    for (dir, file) in [
        ("unikraft/stable", "Makefile"),
        ("libs/musl/stable", "Makefile.uk"),
    ] {
        fs::create_dir_all(root.join(dir)).unwrap();
        fs::write(root.join(dir).join(file), dir).unwrap();
    }
    root
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

// ============================================================================
// ukbuild set
// ============================================================================

#[test]
fn test_set_without_dotconfig_fails() {
    let tmp = TempDir::new().unwrap();
    let dir = project(&tmp, "name = \"hello\"\n");

    ukbuild(&tmp)
        .args(["set", "CONFIG_A=y"])
        .current_dir(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("dotconfig file does not exist"));
}

#[test]
fn test_set_rejects_malformed_argument() {
    let tmp = TempDir::new().unwrap();
    let dir = project(&tmp, "name = \"hello\"\n");
    fs::write(dir.join(".config"), "CONFIG_A=y\n").unwrap();

    ukbuild(&tmp)
        .args(["set", "CONFIG_B="])
        .current_dir(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid or malformed argument: CONFIG_B="));
}

#[test]
fn test_set_updates_dotconfig() {
    let tmp = TempDir::new().unwrap();
    let dir = project(&tmp, "name = \"hello\"\n");
    fs::write(dir.join(".config"), "CONFIG_A=y\n").unwrap();

    ukbuild(&tmp)
        .args(["set", "CONFIG_A=n", "CONFIG_B=42"])
        .current_dir(&dir)
        .assert()
        .success();

    let contents = fs::read_to_string(dir.join(".config")).unwrap();
    assert!(contents.contains("# CONFIG_A is not set"));
    assert!(contents.contains("CONFIG_B=42"));
}

// ============================================================================
// ukbuild build
// ============================================================================

#[test]
fn test_build_target_with_arch_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let dir = project(&tmp, "name = \"hello\"\n");

    ukbuild(&tmp)
        .args(["build", "--target", "A", "--arch", "x86_64"])
        .current_dir(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not supported in addition to `--target`"));
}

#[test]
fn test_build_uninitialized_project_fails() {
    let tmp = TempDir::new().unwrap();

    ukbuild(&tmp)
        .arg("build")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("uninitialized project"));
}

#[test]
fn test_build_without_targets_fails() {
    let tmp = TempDir::new().unwrap();
    let dir = project(&tmp, "name = \"hello\"\n");

    ukbuild(&tmp)
        .args(["build", "--no-fetch"])
        .current_dir(&dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no targets selected to build"));
}

// ============================================================================
// ukbuild source / unsource
// ============================================================================

#[test]
fn test_source_on_unknown_locator_fails() {
    let tmp = TempDir::new().unwrap();

    ukbuild(&tmp)
        .args(["source", "nowhere"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("incompatible package manager"));
}

#[test]
fn test_source_and_unsource_catalog() {
    let tmp = TempDir::new().unwrap();
    let root = catalog(&tmp);
    let sources = tmp.path().join("home/sources.toml");

    ukbuild(&tmp)
        .args(["source", path_arg(&root)])
        .current_dir(tmp.path())
        .assert()
        .success();
    assert!(fs::read_to_string(&sources).unwrap().contains("catalog"));

    ukbuild(&tmp)
        .args(["unsource", path_arg(&root)])
        .current_dir(tmp.path())
        .assert()
        .success();
    assert!(!fs::read_to_string(&sources).unwrap().contains("catalog"));
}

// ============================================================================
// ukbuild update / pull
// ============================================================================

#[test]
fn test_update_writes_index() {
    let tmp = TempDir::new().unwrap();
    let root = catalog(&tmp);

    ukbuild(&tmp)
        .args(["source", path_arg(&root)])
        .current_dir(tmp.path())
        .assert()
        .success();
    ukbuild(&tmp)
        .arg("update")
        .current_dir(tmp.path())
        .assert()
        .success();

    let index = fs::read_to_string(tmp.path().join("home/index.json")).unwrap();
    assert!(index.contains("musl"));
}

#[test]
fn test_pull_project_from_local_catalog() {
    let tmp = TempDir::new().unwrap();
    let root = catalog(&tmp);
    let dir = project(
        &tmp,
        "name = \"hello\"\nunikraft = \"stable\"\n\n[libraries]\nmusl = \"stable\"\n",
    );

    ukbuild(&tmp)
        .args(["source", path_arg(&root)])
        .current_dir(tmp.path())
        .assert()
        .success();

    ukbuild(&tmp)
        .arg("pull")
        .current_dir(&dir)
        .assert()
        .success()
        .stderr(predicate::str::contains("Pulled"));

    assert!(dir.join(".unikraft/unikraft/Makefile").is_file());
    assert!(dir.join(".unikraft/libs/musl/Makefile.uk").is_file());

    // Pulling again leaves the materialized components alone.
    ukbuild(&tmp)
        .arg("pull")
        .current_dir(&dir)
        .assert()
        .success()
        .stderr(predicate::str::contains("Fresh"));
}

#[test]
fn test_pull_list_skips_unknown_packages() {
    let tmp = TempDir::new().unwrap();
    let root = catalog(&tmp);
    let dir = project(&tmp, "name = \"hello\"\n");

    ukbuild(&tmp)
        .args(["source", path_arg(&root)])
        .current_dir(tmp.path())
        .assert()
        .success();

    ukbuild(&tmp)
        .args(["pull", "musl", "nginx"])
        .current_dir(&dir)
        .assert()
        .success()
        .stderr(predicate::str::contains("Skipped 1 item(s)"));

    assert!(dir.join(".unikraft/libs/musl/Makefile.uk").is_file());
}

// ============================================================================
// ukbuild properclean
// ============================================================================

#[test]
fn test_properclean_removes_build_dir() {
    let tmp = TempDir::new().unwrap();
    let dir = project(&tmp, "name = \"hello\"\n");
    fs::create_dir_all(dir.join(".unikraft/build/obj")).unwrap();

    ukbuild(&tmp)
        .arg("properclean")
        .current_dir(&dir)
        .assert()
        .success();

    assert!(!dir.join(".unikraft/build").exists());
}
