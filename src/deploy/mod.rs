//! Deployment: packaging, documentation history, cleaning and reference rewriting

pub mod copy;
pub mod rewrite;

pub use copy::{archive_docs, clean, copy_file, copy_rule, package_dist};
pub use rewrite::{rewrite_references, ReplacementRule, RuleSet};

use crate::config::Project;
use crate::error::{ConfigError, Result};
use std::path::PathBuf;

/// Rewrite the files of a named replacement set
pub fn rewrite_set(project: &Project, set_name: &str) -> Result<Vec<PathBuf>> {
    let set = project.replace.get(set_name).ok_or_else(|| {
        ConfigError::Invalid(format!("Replacement set '{}' is not defined", set_name))
    })?;
    let rules = RuleSet::from_config(set)?;
    let files: Vec<PathBuf> = set.files.iter().map(|f| project.path(f)).collect();
    Ok(rewrite_references(&files, &rules)?)
}
