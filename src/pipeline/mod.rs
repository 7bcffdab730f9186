//! Asset pipeline stages
//!
//! Style: compile, lint, minify. Script: bundle, lint. Each stage is one leaf action;
//! the functions here read the action's resolved sources, hand them to the bound
//! collaborator and write the declared destinations.

pub mod script;
pub mod style;

use crate::config::Project;
use crate::error::{AssetRunError, FsError, Result, ToolError};
use crate::runner::LeafAction;
use crate::tools::{Lint, Violation};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Files matched by the patterns, in pattern order, each pattern's matches sorted
pub fn expand_sources(project: &Project, patterns: &[String]) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();
    for pattern in patterns {
        let absolute = project.path(pattern);
        let Ok(paths) = glob::glob(&absolute.to_string_lossy()) else {
            tracing::warn!("Invalid pattern: {}", pattern);
            continue;
        };
        for path in paths.flatten() {
            if path.is_file() && seen.insert(path.clone()) {
                files.push(path);
            }
        }
    }
    files
}

/// Like `expand_sources`, but an empty match is a missing-source error
pub fn require_sources(project: &Project, action: &LeafAction) -> Result<Vec<PathBuf>> {
    let files = expand_sources(project, &action.src);
    if files.is_empty() {
        return Err(FsError::MissingSource(action.src.join(", ")).into());
    }
    Ok(files)
}

/// The n-th destination of an action as an absolute path
pub fn destination(project: &Project, action: &LeafAction, index: usize) -> Result<PathBuf> {
    action
        .dest
        .get(index)
        .map(|d| project.path(d))
        .ok_or_else(|| {
            AssetRunError::from(crate::error::ConfigError::Invalid(format!(
                "Task '{}' needs at least {} destination(s)",
                action.name,
                index + 1
            )))
        })
}

/// Read a text file
pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        FsError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        }
        .into()
    })
}

/// Write a text file, creating parent directories
pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)
    };
    write().map_err(|e| {
        FsError::Write {
            path: path.to_path_buf(),
            error: e.to_string(),
        }
        .into()
    })
}

/// Prefix an artifact with its banner comment
pub fn with_banner(banner: &str, body: &str) -> String {
    if banner.is_empty() {
        return body.to_string();
    }
    format!("{}\n{}", banner.trim_end(), body)
}

/// Banner for an action: its own `banner` option or the project default
pub fn banner_for<'a>(project: &'a Project, action: &'a LeafAction) -> &'a str {
    action.option("banner").unwrap_or(&project.banner)
}

/// Run a linter over the action's sources and enforce the violation threshold
///
/// `threshold` (default 0) is the largest number of violations that still passes.
pub fn lint(
    project: &Project,
    action: &LeafAction,
    linter: &dyn Lint,
    tool: &str,
) -> Result<Vec<Violation>> {
    let files = require_sources(project, action)?;
    let threshold = match action.option("threshold") {
        Some(value) => value.parse::<usize>().map_err(|_| {
            crate::error::ConfigError::Invalid(format!(
                "Task '{}': threshold '{}' is not a number",
                action.name, value
            ))
        })?,
        None => 0,
    };

    let violations = linter.lint(&files, &action.options)?;
    for violation in &violations {
        tracing::warn!("[{}] {}", action.name, violation.message);
    }

    if violations.len() > threshold {
        return Err(ToolError::LintThreshold {
            tool: tool.to_string(),
            count: violations.len(),
            threshold,
        }
        .into());
    }
    Ok(violations)
}
