//! Configuration validation
//!
//! Everything that can be checked without running a tool is checked here, before the
//! first action of any plan starts.

use crate::config::{resolve, ActionKind, Project};
use crate::deploy::RuleSet;
use crate::error::{ConfigError, ConfigResult, RewriteError, WatchError};
use crate::release::BumpStrategy;
use crate::runner::{LeafAction, TaskNode, TaskRegistry};
use crate::watch::WatchRule;
use std::collections::BTreeMap;

/// Variables the shell tools supply per call, on top of settings and options
const CALL_VARIABLES: &[&str] = &[
    "entry", "files", "src", "dest", "kind", "port", "host", "root", "message", "tag",
];

/// Validate a loaded project against its task registry
pub fn validate_config(project: &Project, registry: &TaskRegistry) -> ConfigResult<()> {
    // Unknown and cyclic task references
    registry.validate()?;

    for name in registry.names() {
        if let Some(TaskNode::Leaf(action)) = registry.get(name) {
            validate_action(project, action)?;
            validate_tool_templates(project, action)?;
        }
    }
    validate_release_templates(project)?;

    for (name, set) in &project.replace {
        RuleSet::from_config(set).map_err(|e| match e {
            RewriteError::InvalidPattern { pattern, error } => ConfigError::InvalidPattern {
                pattern,
                error: format!("{} (replace set '{}')", error, name),
            },
            other => ConfigError::Invalid(other.to_string()),
        })?;
    }

    validate_watch_rules(project, registry)
}

/// Check that an action has the sources, destinations and options its kind needs
pub fn validate_action(project: &Project, action: &LeafAction) -> ConfigResult<()> {
    let (min_src, min_dest) = match action.kind {
        ActionKind::Compile | ActionKind::Minify | ActionKind::Docs => (1, 1),
        ActionKind::Bundle => (1, 2),
        ActionKind::StyleLint | ActionKind::ScriptLint | ActionKind::Clean => (1, 0),
        _ => (0, 0),
    };

    if action.src.len() < min_src {
        return Err(ConfigError::Invalid(format!(
            "Task '{}' ({}) needs a source",
            action.name, action.kind
        )));
    }
    if action.dest.len() < min_dest {
        return Err(ConfigError::Invalid(format!(
            "Task '{}' ({}) needs {} destination(s), found {}",
            action.name,
            action.kind,
            min_dest,
            action.dest.len()
        )));
    }

    match action.kind {
        ActionKind::Exec if action.option("command").is_none() => {
            return Err(ConfigError::Invalid(format!(
                "Task '{}' (exec) needs options.command",
                action.name
            )));
        }
        ActionKind::Rewrite => {
            let set = action.option("rules").ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "Task '{}' (rewrite) needs options.rules naming a replace set",
                    action.name
                ))
            })?;
            if !project.replace.contains_key(set) {
                return Err(ConfigError::Invalid(format!(
                    "Task '{}' refers to unknown replace set '{}'",
                    action.name, set
                )));
            }
        }
        ActionKind::Release => {
            if let Some(strategy) = action.option("strategy") {
                strategy.parse::<BumpStrategy>()?;
            }
        }
        _ => {}
    }

    if let Some(threshold) = action.option("threshold") {
        if threshold.parse::<usize>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "Task '{}': threshold '{}' is not a number",
                action.name, threshold
            )));
        }
    }

    Ok(())
}

/// Tool command templates an action kind expands, and whether action options reach them
fn tool_templates(project: &Project, kind: ActionKind) -> (Vec<&String>, bool) {
    let tools = &project.tools;
    match kind {
        ActionKind::Compile => (tools.compile.iter().collect(), true),
        ActionKind::StyleLint => (tools.style_lint.iter().collect(), true),
        ActionKind::Minify => (tools.minify.iter().collect(), true),
        ActionKind::Bundle => (
            tools.bundle.iter().chain(tools.bundle_min.iter()).collect(),
            true,
        ),
        ActionKind::ScriptLint => (tools.script_lint.iter().collect(), true),
        ActionKind::Docs => (tools.docs.iter().collect(), true),
        ActionKind::Serve => (tools.serve.iter().collect(), false),
        ActionKind::Release => (vec![&tools.vcs.commit, &tools.vcs.tag], false),
        _ => (Vec::new(), false),
    }
}

/// Every placeholder in the tool templates an action uses must name a setting, one of
/// the action's options or a per-call variable
fn validate_tool_templates(project: &Project, action: &LeafAction) -> ConfigResult<()> {
    let (templates, with_options) = tool_templates(project, action.kind);
    if templates.is_empty() {
        return Ok(());
    }

    let mut vars = project.settings.clone();
    if with_options {
        vars.extend(action.options.clone());
    }
    vars.extend(CALL_VARIABLES.iter().map(|name| (name.to_string(), String::new())));

    for template in templates {
        resolve(template, &vars)?;
    }
    Ok(())
}

/// Release tag and message templates see the settings plus `${version}`
fn validate_release_templates(project: &Project) -> ConfigResult<()> {
    let mut vars: BTreeMap<String, String> = project.settings.clone();
    vars.insert("version".to_string(), String::new());

    let release = &project.release;
    for template in [&release.tag_name, &release.commit_message, &release.tag_message] {
        resolve(template, &vars)?;
    }
    Ok(())
}

/// Watch rules must name known tasks that never start another session
fn validate_watch_rules(project: &Project, registry: &TaskRegistry) -> ConfigResult<()> {
    for spec in &project.watch {
        WatchRule::new(spec, &project.root).map_err(|e| match e {
            WatchError::Pattern { pattern, error } => {
                ConfigError::InvalidPattern { pattern, error }
            }
            other => ConfigError::Invalid(other.to_string()),
        })?;

        if spec.tasks.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "Watch rule '{}' has no tasks",
                spec.name
            )));
        }

        for task in &spec.tasks {
            let plan = registry.expand(task)?;
            if let Some(session) = plan.actions.iter().find(|a| a.kind.is_session()) {
                return Err(ConfigError::Invalid(format!(
                    "Watch rule '{}' would start '{}' ({}), which never finishes",
                    spec.name, session.name, session.kind
                )));
            }
        }
    }
    Ok(())
}
