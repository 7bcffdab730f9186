//! Binary behaviour: operations as subcommands, exit status, report output

mod common;

use assert_cmd::Command;
use common::{create_project, create_widget_project, read_file};
use predicates::prelude::*;
use std::fs;

fn assetrun() -> Command {
    let mut cmd = Command::cargo_bin("assetrun").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_list_shows_public_operations() {
    let (dir, _) = create_widget_project();
    assetrun()
        .current_dir(dir.path())
        .arg("--list")
        .assert()
        .success()
        .stdout(predicate::str::contains("build"))
        .stdout(predicate::str::contains("deployRelease"))
        .stdout(predicate::str::contains("sass").not());
}

#[test]
fn test_build_from_subdirectory() {
    let (dir, _) = create_widget_project();
    let sub_dir = dir.path().join("js");
    assetrun()
        .current_dir(&sub_dir)
        .arg("build")
        .assert()
        .success();
    assert!(read_file(dir.path(), "dist/styles.min.css").starts_with("/*! widget v2.1.0 */"));
}

#[test]
fn test_explicit_file_flag() {
    let (dir, config_path) = create_widget_project();
    let elsewhere = tempfile::TempDir::new().unwrap();
    assetrun()
        .current_dir(elsewhere.path())
        .arg("-f")
        .arg(&config_path)
        .arg("build")
        .assert()
        .success();
    assert!(dir.path().join("dist/scripts.min.js").is_file());
}

#[test]
fn test_compile_failure_exits_non_zero() {
    let (dir, config_path) = create_widget_project();
    let config = fs::read_to_string(&config_path)
        .unwrap()
        .replace("compile: 'cat ${entry}'", "compile: 'echo \"bad token\" >&2; exit 2'");
    fs::write(&config_path, config).unwrap();

    assetrun()
        .current_dir(dir.path())
        .arg("build")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("sass"))
        .stderr(predicate::str::contains("bad token"));
    assert!(!dir.path().join("dist/styles.min.css").exists());
}

#[test]
fn test_json_report() {
    let (dir, _) = create_widget_project();
    let output = assetrun()
        .current_dir(dir.path())
        .args(["build", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["operation"], "build");
    assert_eq!(report["success"], true);
    assert_eq!(report["results"][0]["task"], "sass");
    assert_eq!(report["results"][0]["outcome"], "ran");
}

#[test]
fn test_dry_run_writes_nothing() {
    let (dir, _) = create_widget_project();
    assetrun()
        .current_dir(dir.path())
        .args(["build", "--dry-run"])
        .assert()
        .success()
        .stderr(predicate::str::contains("would run"));
    assert!(!dir.path().join("dist").exists());
}

#[test]
fn test_unresolved_setting_is_configuration_error() {
    let (dir, _) = create_project(
        r#"
settings:
  distPath: ${buildRoot}/dist
tasks:
  build:
    action: clean
    src: ${distPath}
"#,
        "widget",
        "2.1.0",
    );
    assetrun()
        .current_dir(dir.path())
        .arg("build")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("buildRoot"));
}

#[test]
fn test_unknown_tool_placeholder_stops_before_clean() {
    let (dir, _) = create_project(
        r#"
tools:
  minify: 'cat ${typo}'
tasks:
  wipe:
    action: clean
    private: true
    src: history/
  cssmin:
    action: minify
    private: true
    src: dist/styles.css
    dest: dist/styles.min.css
  build: [wipe, cssmin]
"#,
        "widget",
        "2.1.0",
    );
    common::write_file(dir.path(), "history/2.0.0/index.html", "<html></html>\n");
    common::write_file(dir.path(), "dist/styles.css", "a {}\n");

    assetrun()
        .current_dir(dir.path())
        .arg("build")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("typo"));
    assert!(dir.path().join("history/2.0.0/index.html").is_file());
}

#[test]
fn test_empty_interpreter_is_configuration_error() {
    let (dir, _) = create_project(
        r#"
interpreter: []
tasks:
  qunit:
    action: exec
    options:
      command: echo ran
"#,
        "widget",
        "2.1.0",
    );
    assetrun()
        .current_dir(dir.path())
        .arg("qunit")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("interpreter"))
        .stderr(predicate::str::contains("panicked").not());
}

#[test]
fn test_env_file_feeds_templates() {
    let (dir, _) = create_project(
        r#"
tasks:
  stamp:
    action: exec
    options:
      command: echo ${env.ASSETRUN_TEST_TARGET} > target.txt
"#,
        "widget",
        "2.1.0",
    );
    fs::write(dir.path().join(".env"), "ASSETRUN_TEST_TARGET=staging\n").unwrap();

    assetrun()
        .current_dir(dir.path())
        .env_remove("ASSETRUN_TEST_TARGET")
        .arg("stamp")
        .assert()
        .success();
    assert_eq!(read_file(dir.path(), "target.txt").trim(), "staging");
}

#[test]
fn test_missing_config() {
    let dir = tempfile::TempDir::new().unwrap();
    assetrun()
        .current_dir(dir.path())
        .arg("build")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("assetrun.yml"));
}

#[test]
fn test_completions() {
    let (dir, _) = create_widget_project();
    assetrun()
        .current_dir(dir.path())
        .args(["--completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deployRelease"));
}
