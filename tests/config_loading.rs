//! Loading project files: discovery, resolution, validation and plan expansion

mod common;

use assetrun::config::{
    find_config_file_from, parse_config, parse_config_file, validate_config, ActionKind,
    Project, TaskDef, VersionRecord,
};
use assetrun::error::ConfigError;
use assetrun::runner::TaskRegistry;
use common::{create_project, write_file};
use std::path::PathBuf;

const DEMO_CONFIG: &str = include_str!("../demos/assetrun.yml");

fn plan_names(registry: &TaskRegistry, operation: &str) -> Vec<String> {
    registry
        .expand(operation)
        .unwrap()
        .actions
        .into_iter()
        .map(|a| a.name)
        .collect()
}

#[test]
fn test_demo_config_loads_and_validates() {
    let (dir, config_path) = create_project(DEMO_CONFIG, "styleguide", "1.4.0");
    write_file(dir.path(), "scss/styles.scss", "a {}\n");

    let config = parse_config_file(&config_path).unwrap();
    let project = Project::load(config, &config_path).unwrap();
    let registry = TaskRegistry::from_project(&project);
    validate_config(&project, &registry).unwrap();

    assert_eq!(project.root, dir.path());
    assert_eq!(project.package, VersionRecord::new("styleguide", "1.4.0"));
    assert_eq!(project.settings["distCSSFileMin"], "dist/styles.min.css");
    assert_eq!(project.archive.history_dir, "history/1.4.0");
    assert_eq!(project.banner, "/* styleguide version 1.4.0: CMS */");

    let operations: Vec<&str> = registry.operations().map(|(name, _)| name).collect();
    for expected in ["clean", "build", "dev", "deployDev", "deployRelease", "viewdocs"] {
        assert!(operations.contains(&expected), "missing {}", expected);
    }
    assert!(!operations.contains(&"sass"));
}

#[test]
fn test_demo_build_leaves_outputs_in_place() {
    let (_dir, config_path) = create_project(DEMO_CONFIG, "styleguide", "1.4.0");
    let project = Project::load(parse_config_file(&config_path).unwrap(), &config_path).unwrap();
    let registry = TaskRegistry::from_project(&project);

    let build = registry.expand("build").unwrap();
    assert!(build.actions.iter().all(|a| a.kind != ActionKind::Clean));
    assert_eq!(plan_names(&registry, "clean"), vec!["cleanDist", "cleanDocs"]);
    assert_eq!(
        plan_names(&registry, "deployDev")[..3].to_vec(),
        vec!["cleanDist", "cleanDocs", "sass"]
    );
}

#[test]
fn test_demo_release_plan_order() {
    let (_dir, config_path) = create_project(DEMO_CONFIG, "styleguide", "1.4.0");
    let project = Project::load(parse_config_file(&config_path).unwrap(), &config_path).unwrap();
    let registry = TaskRegistry::from_project(&project);

    assert_eq!(
        plan_names(&registry, "deployRelease"),
        vec![
            "cleanDist",
            "cleanDocs",
            "sass",
            "csslint",
            "cssmin",
            "styledocco",
            "jshint",
            "uglify",
            "qunit",
            "archiveDocs",
            "packageDist",
            "replaceDocIndex",
            "replaceDeployProps",
            "bumpVersion",
        ]
    );
}

#[test]
fn test_deploy_props_rules_keep_capture_references() {
    let (_dir, config_path) = create_project(DEMO_CONFIG, "styleguide", "1.4.0");
    let project = Project::load(parse_config_file(&config_path).unwrap(), &config_path).unwrap();

    let set = &project.replace["deployProps"];
    assert_eq!(set.files, vec!["deployment.properties"]);
    assert_eq!(set.rules[0].to, "${1}styleguide");
    assert_eq!(set.rules[1].to, "${1}1.4.0");
    assert!(!set.rules[0].all);
    assert_eq!(
        project.replace["docIndex"].files,
        vec!["index.html", "history/1.4.0/index.html"]
    );
}

#[test]
fn test_newer_prefix_forces_incremental() {
    let yaml = r#"
tasks:
  package:
    action: package_dist
    src: dist
  eager: [package]
  lazy: ["newer:package"]
"#;
    let project = Project::new(
        parse_config(yaml).unwrap(),
        PathBuf::from("/work"),
        VersionRecord::new("widget", "2.1.0"),
    )
    .unwrap();
    let registry = TaskRegistry::from_project(&project);

    assert!(!registry.expand("eager").unwrap().actions[0].incremental);
    assert!(registry.expand("lazy").unwrap().actions[0].incremental);
}

#[test]
fn test_task_shapes() {
    let yaml = r#"
tasks:
  build: [sass, cssmin]
  dev:
    usage: Build and watch
    private: true
    run: build
  sass:
    action: compile
    src: scss/styles.scss
    dest: dist/styles.css
  cssmin:
    action: minify
    src: dist/styles.css
    dest: dist/styles.min.css
    options:
      level: "2"
"#;
    let config = parse_config(yaml).unwrap();
    assert!(matches!(&config.tasks["build"], TaskDef::Alias(list) if list.len() == 2));
    assert!(matches!(&config.tasks["dev"], TaskDef::Group(group) if group.private && group.run == vec!["build"]));
    match &config.tasks["cssmin"] {
        TaskDef::Action(def) => assert_eq!(def.options["level"], "2"),
        other => panic!("expected an action, got {:?}", other),
    }
}

#[test]
fn test_config_found_from_subdirectory() {
    let (dir, config_path) = create_project("tasks: {}\n", "widget", "2.1.0");
    write_file(dir.path(), "scss/partials/_base.scss", "");

    let found = find_config_file_from(dir.path().join("scss/partials")).unwrap();
    assert_eq!(found, config_path);

    let project = Project::load(parse_config_file(&found).unwrap(), &found).unwrap();
    assert_eq!(project.path("dist"), dir.path().join("dist"));
}

#[test]
fn test_missing_package_record() {
    let (dir, config_path) = create_project("package: meta/package.json\ntasks: {}\n", "widget", "2.1.0");
    let err = Project::load(parse_config_file(&config_path).unwrap(), &config_path).unwrap_err();
    match err {
        ConfigError::VersionRecord { path, .. } => {
            assert_eq!(path, dir.path().join("meta/package.json"))
        }
        other => panic!("expected a version record error, got {:?}", other),
    }
}

#[test]
fn test_unresolved_reference_names_the_setting() {
    let yaml = r#"
settings:
  distCSSFile: ${distPath}styles.css
tasks: {}
"#;
    let err = Project::new(
        parse_config(yaml).unwrap(),
        PathBuf::from("/work"),
        VersionRecord::new("widget", "2.1.0"),
    )
    .unwrap_err();
    match err {
        ConfigError::UnresolvedReference { reference, template } => {
            assert_eq!(reference, "distPath");
            assert_eq!(template, "${distPath}styles.css");
        }
        other => panic!("expected an unresolved reference, got {:?}", other),
    }
}

#[test]
fn test_cyclic_alias_is_rejected() {
    let yaml = r#"
tasks:
  build: [deploy]
  deploy: [build]
"#;
    let project = Project::new(
        parse_config(yaml).unwrap(),
        PathBuf::from("/work"),
        VersionRecord::new("widget", "2.1.0"),
    )
    .unwrap();
    let registry = TaskRegistry::from_project(&project);
    let err = validate_config(&project, &registry).unwrap_err();
    assert!(matches!(err, ConfigError::CyclicTask(_)));
}

#[test]
fn test_env_prefix_reads_environment() {
    std::env::set_var("ASSETRUN_CONFIG_TEST_DIST", "public/");
    let yaml = r#"
settings:
  distPath: ${env.ASSETRUN_CONFIG_TEST_DIST}
tasks:
  clean:
    action: clean
    src: ${distPath}
"#;
    let project = Project::new(
        parse_config(yaml).unwrap(),
        PathBuf::from("/work"),
        VersionRecord::new("widget", "2.1.0"),
    )
    .unwrap();
    assert_eq!(project.settings["distPath"], "public/");
    match &project.tasks["clean"] {
        TaskDef::Action(def) => assert_eq!(def.src, vec!["public/"]),
        other => panic!("expected an action, got {:?}", other),
    }
}
