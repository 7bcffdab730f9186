//! Core configuration types
//!
//! This module defines the data structures that represent an assetrun.yml project file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Project name (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Project usage description (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Path to the JSON version record carrying `name` and `version`
    #[serde(default = "default_package_file")]
    pub package: String,

    /// Directory for incremental stamps
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,

    /// Global interpreter to use for commands (e.g., ["sh", "-c"])
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<Vec<String>>,

    /// Path and value templates
    #[serde(default)]
    pub settings: BTreeMap<String, String>,

    /// External tool commands
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Tasks defined in the configuration
    #[serde(default)]
    pub tasks: BTreeMap<String, TaskDef>,

    /// File watch rules
    #[serde(default)]
    pub watch: WatchConfig,

    /// Static file server options
    #[serde(default)]
    pub serve: ServeConfig,

    /// Documentation history rules
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Named replacement rule sets
    #[serde(default)]
    pub replace: BTreeMap<String, ReplaceSet>,

    /// Release options
    #[serde(default)]
    pub release: ReleaseConfig,
}

fn default_package_file() -> String {
    "package.json".to_string()
}

fn default_cache_dir() -> String {
    ".assetrun".to_string()
}

/// A task definition
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TaskDef {
    /// Bare list of task names
    Alias(Vec<String>),

    /// Alias with help text
    Group(GroupDef),

    /// A single leaf action
    Action(ActionDef),
}

/// Alias task with metadata
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GroupDef {
    /// Usage description for help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Whether this task is private (hidden from help)
    #[serde(default)]
    pub private: bool,

    /// Task names to run in order
    #[serde(deserialize_with = "deserialize_one_or_many")]
    pub run: Vec<String>,
}

/// A leaf action bound to one external capability
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActionDef {
    /// The capability this action invokes
    pub action: ActionKind,

    /// Usage description for help text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,

    /// Whether this task is private (hidden from help)
    #[serde(default)]
    pub private: bool,

    /// Source patterns
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub src: Vec<String>,

    /// Destination patterns
    #[serde(default, deserialize_with = "deserialize_one_or_many")]
    pub dest: Vec<String>,

    /// Tool options
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,

    /// Override incremental filtering for this action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub incremental: Option<bool>,
}

/// The capability a leaf action is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Clean,
    Compile,
    StyleLint,
    Minify,
    Bundle,
    ScriptLint,
    Docs,
    Exec,
    PackageDist,
    ArchiveDocs,
    Rewrite,
    Release,
    Serve,
    Watch,
}

impl ActionKind {
    /// Whether the incremental filter applies unless the action opts out
    pub fn incremental_by_default(self) -> bool {
        matches!(
            self,
            ActionKind::Compile
                | ActionKind::StyleLint
                | ActionKind::Minify
                | ActionKind::Bundle
                | ActionKind::ScriptLint
                | ActionKind::Docs
        )
    }

    /// Long-running sessions that block until shutdown
    pub fn is_session(self) -> bool {
        matches!(self, ActionKind::Serve | ActionKind::Watch)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Clean => "clean",
            ActionKind::Compile => "compile",
            ActionKind::StyleLint => "style_lint",
            ActionKind::Minify => "minify",
            ActionKind::Bundle => "bundle",
            ActionKind::ScriptLint => "script_lint",
            ActionKind::Docs => "docs",
            ActionKind::Exec => "exec",
            ActionKind::PackageDist => "package_dist",
            ActionKind::ArchiveDocs => "archive_docs",
            ActionKind::Rewrite => "rewrite",
            ActionKind::Release => "release",
            ActionKind::Serve => "serve",
            ActionKind::Watch => "watch",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Command templates for the shell-backed collaborators
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolsConfig {
    /// Style compiler; stdout is the compiled stylesheet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compile: Option<String>,

    /// Style linter; each stdout line is a violation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_lint: Option<String>,

    /// Minifier; reads stdin, writes stdout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minify: Option<String>,

    /// Script bundler, unminified variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<String>,

    /// Script bundler, minified variant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle_min: Option<String>,

    /// Script linter; each stdout line is a violation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_lint: Option<String>,

    /// Documentation generator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<String>,

    /// Static file server, kept running until stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serve: Option<String>,

    /// Version control commands
    #[serde(default)]
    pub vcs: VcsConfig,

    /// Banner template injected into distributables
    #[serde(default = "default_banner")]
    pub banner: String,
}

pub fn default_banner() -> String {
    "/*! ${pkg.name} v${pkg.version} */".to_string()
}

/// Version control command templates
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VcsConfig {
    #[serde(default = "default_commit_command")]
    pub commit: String,

    #[serde(default = "default_tag_command")]
    pub tag: String,

    #[serde(default = "default_push_command")]
    pub push: String,

    #[serde(default = "default_push_tags_command")]
    pub push_tags: String,

    #[serde(default = "default_publish_command")]
    pub publish: String,
}

impl Default for VcsConfig {
    fn default() -> Self {
        VcsConfig {
            commit: default_commit_command(),
            tag: default_tag_command(),
            push: default_push_command(),
            push_tags: default_push_tags_command(),
            publish: default_publish_command(),
        }
    }
}

fn default_commit_command() -> String {
    "git commit -am \"${message}\"".to_string()
}

fn default_tag_command() -> String {
    "git tag -a \"${tag}\" -m \"${message}\"".to_string()
}

fn default_push_command() -> String {
    "git push".to_string()
}

fn default_push_tags_command() -> String {
    "git push --tags".to_string()
}

fn default_publish_command() -> String {
    "npm publish".to_string()
}

/// Watch section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchConfig {
    /// Default quiet period before a rule fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Named watch rules
    #[serde(default)]
    pub rules: BTreeMap<String, WatchRuleDef>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            debounce_ms: default_debounce_ms(),
            rules: BTreeMap::new(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    250
}

/// A single watch rule
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WatchRuleDef {
    /// Watched path patterns
    #[serde(deserialize_with = "deserialize_one_or_many")]
    pub files: Vec<String>,

    /// Tasks to run when a file changes
    #[serde(deserialize_with = "deserialize_one_or_many")]
    pub tasks: Vec<String>,

    /// Per-rule debounce override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
}

/// Static file server options
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServeConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default)]
    pub keep_alive: bool,

    /// Directory to serve
    #[serde(default = "default_serve_root")]
    pub root: String,
}

impl Default for ServeConfig {
    fn default() -> Self {
        ServeConfig {
            port: default_port(),
            host: default_host(),
            keep_alive: false,
            root: default_serve_root(),
        }
    }
}

fn default_port() -> u16 {
    9000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_serve_root() -> String {
    ".".to_string()
}

/// Documentation history section
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArchiveConfig {
    /// Version-keyed history directory
    #[serde(default = "default_history_dir")]
    pub history_dir: String,

    /// Files to copy into the history directory
    #[serde(default)]
    pub copy: Vec<CopyRuleDef>,

    /// Documentation entry point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,

    /// Where the entry point is copied for serving
    #[serde(default = "default_top_level")]
    pub top_level: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        ArchiveConfig {
            history_dir: default_history_dir(),
            copy: Vec::new(),
            entry_point: None,
            top_level: default_top_level(),
        }
    }
}

fn default_history_dir() -> String {
    "history/${pkg.version}".to_string()
}

fn default_top_level() -> String {
    "index.html".to_string()
}

/// A copy rule; destination is relative to the history directory
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CopyRuleDef {
    /// Base directory that source patterns and kept paths are relative to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<String>,

    #[serde(deserialize_with = "deserialize_one_or_many")]
    pub src: Vec<String>,

    #[serde(default)]
    pub dest: String,

    /// Drop directory structure
    #[serde(default)]
    pub flatten: bool,
}

/// A named set of replacement rules
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplaceSet {
    /// Files rewritten in place
    #[serde(deserialize_with = "deserialize_one_or_many")]
    pub files: Vec<String>,

    /// Rules applied in order
    pub rules: Vec<ReplaceRuleDef>,
}

/// One (pattern, replacement) pair
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReplaceRuleDef {
    /// Regular expression
    pub from: String,

    /// Replacement; `${1}` refers to capture groups
    pub to: String,

    /// Replace every match instead of only the first
    #[serde(default = "default_true")]
    pub all: bool,
}

fn default_true() -> bool {
    true
}

/// Release options; every side effect defaults to off
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReleaseConfig {
    #[serde(default)]
    pub bump: bool,

    #[serde(default)]
    pub commit: bool,

    #[serde(default)]
    pub tag: bool,

    #[serde(default)]
    pub push: bool,

    #[serde(default)]
    pub push_tags: bool,

    #[serde(default)]
    pub publish: bool,

    /// Version record to bump; defaults to the package file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    #[serde(default = "default_tag_name")]
    pub tag_name: String,

    #[serde(default = "default_commit_message")]
    pub commit_message: String,

    #[serde(default = "default_tag_message")]
    pub tag_message: String,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        ReleaseConfig {
            bump: false,
            commit: false,
            tag: false,
            push: false,
            push_tags: false,
            publish: false,
            file: None,
            tag_name: default_tag_name(),
            commit_message: default_commit_message(),
            tag_message: default_tag_message(),
        }
    }
}

fn default_tag_name() -> String {
    "${version}".to_string()
}

fn default_commit_message() -> String {
    "Bumping version to ${version}".to_string()
}

fn default_tag_message() -> String {
    "Tagging version ${version}".to_string()
}

/// Custom deserializer for fields that accept a single string or a list
fn deserialize_one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_yaml::Value;

    let value = Value::deserialize(deserializer)?;

    match value {
        Value::String(s) => Ok(vec![s]),
        Value::Sequence(seq) => {
            let mut items = Vec::new();
            for item in seq {
                let s = String::deserialize(item).map_err(D::Error::custom)?;
                items.push(s);
            }
            Ok(items)
        }
        Value::Null => Ok(Vec::new()),
        _ => Err(D::Error::custom("expected a string or a list of strings")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_task_shapes() {
        let yaml = r#"
tasks:
  build: [compile, minify]
  dev:
    usage: Build and watch
    run: [build, watch]
  compile:
    action: compile
    src: scss/styles.scss
    dest: dist/styles.css
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tasks.len(), 3);
        assert!(matches!(config.tasks["build"], TaskDef::Alias(ref v) if v.len() == 2));
        assert!(matches!(config.tasks["dev"], TaskDef::Group(ref g) if g.run == vec!["build", "watch"]));
        match &config.tasks["compile"] {
            TaskDef::Action(def) => {
                assert_eq!(def.action, ActionKind::Compile);
                assert_eq!(def.src, vec!["scss/styles.scss"]);
                assert_eq!(def.dest, vec!["dist/styles.css"]);
            }
            other => panic!("expected action, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("tasks: {}").unwrap();
        assert_eq!(config.package, "package.json");
        assert_eq!(config.watch.debounce_ms, 250);
        assert_eq!(config.serve.port, 9000);
        assert!(!config.release.bump);
        assert!(!config.release.commit);
        assert!(!config.release.tag);
        assert!(!config.release.push);
        assert!(!config.release.publish);
    }

    #[test]
    fn test_replace_rule_defaults_to_all() {
        let yaml = r#"
replace:
  props:
    files: deployment.properties
    rules:
      - from: "(VERSION=)(.*)"
        to: "${1}2.0.0"
        all: false
      - from: "a"
        to: "b"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let set = &config.replace["props"];
        assert_eq!(set.files, vec!["deployment.properties"]);
        assert!(!set.rules[0].all);
        assert!(set.rules[1].all);
    }

    #[test]
    fn test_incremental_defaults() {
        assert!(ActionKind::Compile.incremental_by_default());
        assert!(ActionKind::Bundle.incremental_by_default());
        assert!(!ActionKind::Clean.incremental_by_default());
        assert!(!ActionKind::PackageDist.incremental_by_default());
        assert!(ActionKind::Watch.is_session());
    }
}
