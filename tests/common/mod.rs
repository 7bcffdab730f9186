//! Common test utilities

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Tool commands built from coreutils so tests need nothing else installed
pub const SHELL_TOOLS: &str = r#"
tools:
  compile: 'cat ${entry}'
  style_lint: 'grep -H "!important" ${files} || true'
  minify: 'tr -d " \n"'
  bundle: 'cat ${files}'
  bundle_min: 'cat ${files} | tr -d " \n"'
  script_lint: 'grep -H "debugger" ${files} || true'
"#;

/// The widget library layout: sources, package record and deploy descriptor
pub const WIDGET_CONFIG: &str = r#"
name: widget
settings:
  distPath: dist/
  distCSSFile: ${distPath}styles.css
  distCSSMinFile: ${distPath}styles.min.css
tasks:
  sass:
    action: compile
    private: true
    src: [scss/styles.scss, scss/**/*.scss]
    dest: ${distCSSFile}
  csslint:
    action: style_lint
    private: true
    src: ${distCSSFile}
  cssmin:
    action: minify
    private: true
    src: ${distCSSFile}
    dest: ${distCSSMinFile}
  uglify:
    action: bundle
    private: true
    src: [js/vendor/*.js, js/*.js]
    dest:
      - ${distPath}scripts.js
      - ${distPath}scripts.min.js
  jshint:
    action: script_lint
    private: true
    src: js/*.js
  packageDist:
    action: package_dist
    private: true
    src: dist
    incremental: false
  replaceDeployProps:
    action: rewrite
    private: true
    options:
      rules: deployProps
  build:
    usage: Compile, lint and minify styles and scripts
    run: [sass, csslint, cssmin, uglify, jshint]
  deployRelease:
    usage: Build and package a release
    run: [build, packageDist, replaceDeployProps]
replace:
  deployProps:
    files: deployment.properties
    rules:
      - from: "(ARTIFACT_ID=)(.*)"
        to: "${1}${pkg.name}"
        all: false
      - from: "(VERSION=)(.*)"
        to: "${1}${pkg.version}"
        all: false
"#;

/// Create a temporary project with an assetrun.yml file and a package record
pub fn create_project(config: &str, name: &str, version: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("assetrun.yml");
    fs::write(&config_path, config).unwrap();
    fs::write(
        temp_dir.path().join("package.json"),
        format!(
            "{{\n  \"name\": \"{}\",\n  \"version\": \"{}\"\n}}\n",
            name, version
        ),
    )
    .unwrap();
    (temp_dir, config_path)
}

/// Widget project with sources in place
pub fn create_widget_project() -> (TempDir, PathBuf) {
    let config = format!("{}{}", WIDGET_CONFIG, SHELL_TOOLS);
    let (dir, config_path) = create_project(&config, "widget", "2.1.0");
    write_file(dir.path(), "scss/styles.scss", "a { color: red; }\n");
    write_file(dir.path(), "scss/partials/_base.scss", "// base\n");
    write_file(dir.path(), "js/vendor/lib.js", "var lib = 1;\n");
    write_file(dir.path(), "js/app.js", "var app = lib + 1;\n");
    write_file(
        dir.path(),
        "deployment.properties",
        "ARTIFACT_ID=old\nVERSION=1.0.0\n",
    );
    (dir, config_path)
}

/// Write a file, creating parent directories
pub fn write_file(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

pub fn read_file(root: &Path, relative: &str) -> String {
    fs::read_to_string(root.join(relative)).unwrap()
}
