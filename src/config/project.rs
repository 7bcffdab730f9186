//! Resolved project configuration
//!
//! A `Project` is built once at startup from the parsed `Config`: settings are resolved
//! to a fixed point and every path template in tasks, watch rules, copy rules and
//! replacement rules is expanded. The value is immutable for the rest of the run and is
//! passed explicitly to every component.

use crate::config::resolve::{resolve, resolve_all, resolve_list, resolve_map};
use crate::config::types::{
    ActionDef, ArchiveConfig, Config, CopyRuleDef, ReleaseConfig, ReplaceRuleDef,
    ReplaceSet, ServeConfig, TaskDef, ToolsConfig,
};
use crate::config::version::VersionRecord;
use crate::error::{ConfigError, ConfigResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A resolved watch rule
#[derive(Debug, Clone, PartialEq)]
pub struct WatchRuleSpec {
    pub name: String,
    pub files: Vec<String>,
    pub tasks: Vec<String>,
    pub debounce: Duration,
}

/// Fully resolved, immutable project configuration
#[derive(Debug, Clone)]
pub struct Project {
    /// Directory containing the project file; relative paths resolve against it
    pub root: PathBuf,
    pub name: Option<String>,
    pub usage: Option<String>,
    pub package: VersionRecord,
    pub package_file: PathBuf,
    pub cache_dir: PathBuf,
    pub interpreter: Vec<String>,
    /// Resolved settings, including `pkg.name` and `pkg.version`
    pub settings: BTreeMap<String, String>,
    /// Tool command templates, resolved per invocation
    pub tools: ToolsConfig,
    /// Resolved banner text
    pub banner: String,
    pub tasks: BTreeMap<String, TaskDef>,
    pub watch: Vec<WatchRuleSpec>,
    pub serve: ServeConfig,
    pub archive: ArchiveConfig,
    pub replace: BTreeMap<String, ReplaceSet>,
    /// Release messages keep `${version}` until the new version is known
    pub release: ReleaseConfig,
}

impl Project {
    /// Load the version record next to the config file and resolve everything
    pub fn load(config: Config, config_path: &Path) -> ConfigResult<Self> {
        let root = config_path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        let package = VersionRecord::read(&root.join(&config.package))?;
        Self::new(config, root, package)
    }

    /// Resolve a configuration against an already known version record
    pub fn new(config: Config, root: PathBuf, package: VersionRecord) -> ConfigResult<Self> {
        let mut raw = config.settings.clone();
        raw.insert("pkg.name".to_string(), package.name.clone());
        raw.insert("pkg.version".to_string(), package.version.clone());
        let settings = resolve_all(&raw)?;

        let tasks = config
            .tasks
            .iter()
            .map(|(name, def)| Ok((name.clone(), resolve_task(def, &settings)?)))
            .collect::<ConfigResult<BTreeMap<_, _>>>()?;

        let watch = config
            .watch
            .rules
            .iter()
            .map(|(name, rule)| {
                Ok(WatchRuleSpec {
                    name: name.clone(),
                    files: resolve_list(&rule.files, &settings)?,
                    tasks: rule.tasks.clone(),
                    debounce: Duration::from_millis(
                        rule.debounce_ms.unwrap_or(config.watch.debounce_ms),
                    ),
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        let serve = ServeConfig {
            host: resolve(&config.serve.host, &settings)?,
            root: resolve(&config.serve.root, &settings)?,
            ..config.serve.clone()
        };

        let archive = ArchiveConfig {
            history_dir: resolve(&config.archive.history_dir, &settings)?,
            copy: config
                .archive
                .copy
                .iter()
                .map(|rule| resolve_copy_rule(rule, &settings))
                .collect::<ConfigResult<Vec<_>>>()?,
            entry_point: config
                .archive
                .entry_point
                .as_deref()
                .map(|p| resolve(p, &settings))
                .transpose()?,
            top_level: resolve(&config.archive.top_level, &settings)?,
        };

        let replace = config
            .replace
            .iter()
            .map(|(name, set)| Ok((name.clone(), resolve_replace_set(set, &settings)?)))
            .collect::<ConfigResult<BTreeMap<_, _>>>()?;

        let mut release = config.release.clone();
        release.file = release
            .file
            .as_deref()
            .map(|f| resolve(f, &settings))
            .transpose()?;

        let banner = resolve(&config.tools.banner, &settings)?;
        let cache_dir = root.join(resolve(&config.cache_dir, &settings)?);
        let package_file = root.join(&config.package);

        let interpreter = config
            .interpreter
            .unwrap_or_else(|| vec!["sh".to_string(), "-c".to_string()]);
        if interpreter.first().map_or(true, |program| program.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "interpreter must name a program, e.g. [sh, -c]".to_string(),
            ));
        }

        Ok(Project {
            root,
            name: config.name,
            usage: config.usage,
            package,
            package_file,
            cache_dir,
            interpreter,
            settings,
            tools: config.tools,
            banner,
            tasks,
            watch,
            serve,
            archive,
            replace,
            release,
        })
    }

    /// Resolve a path relative to the project root
    pub fn path(&self, relative: &str) -> PathBuf {
        let path = Path::new(relative);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Display name of the project
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.package.name)
    }
}

fn resolve_task(def: &TaskDef, settings: &BTreeMap<String, String>) -> ConfigResult<TaskDef> {
    Ok(match def {
        TaskDef::Alias(_) | TaskDef::Group(_) => def.clone(),
        TaskDef::Action(action) => TaskDef::Action(ActionDef {
            src: resolve_list(&action.src, settings)?,
            dest: resolve_list(&action.dest, settings)?,
            options: resolve_map(&action.options, settings)?,
            ..action.clone()
        }),
    })
}

fn resolve_copy_rule(
    rule: &CopyRuleDef,
    settings: &BTreeMap<String, String>,
) -> ConfigResult<CopyRuleDef> {
    Ok(CopyRuleDef {
        cwd: rule.cwd.as_deref().map(|c| resolve(c, settings)).transpose()?,
        src: resolve_list(&rule.src, settings)?,
        dest: resolve(&rule.dest, settings)?,
        flatten: rule.flatten,
    })
}

fn resolve_replace_set(
    set: &ReplaceSet,
    settings: &BTreeMap<String, String>,
) -> ConfigResult<ReplaceSet> {
    Ok(ReplaceSet {
        files: resolve_list(&set.files, settings)?,
        rules: set
            .rules
            .iter()
            .map(|rule| {
                Ok(ReplaceRuleDef {
                    from: rule.from.clone(),
                    to: resolve(&rule.to, settings)?,
                    all: rule.all,
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?,
    })
}
