//! In-place reference rewriting for deploy targets

use crate::config::ReplaceSet;
use crate::error::{RewriteError, RewriteResult};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// A compiled (pattern, replacement) pair
#[derive(Debug, Clone)]
pub struct ReplacementRule {
    pattern: Regex,
    replacement: String,
    all: bool,
}

impl ReplacementRule {
    pub fn new(pattern: &str, replacement: impl Into<String>, all: bool) -> RewriteResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| RewriteError::InvalidPattern {
            pattern: pattern.to_string(),
            error: e.to_string(),
        })?;
        Ok(ReplacementRule {
            pattern,
            replacement: replacement.into(),
            all,
        })
    }

    pub fn apply(&self, text: &str) -> String {
        if self.all {
            self.pattern
                .replace_all(text, self.replacement.as_str())
                .into_owned()
        } else {
            self.pattern
                .replace(text, self.replacement.as_str())
                .into_owned()
        }
    }
}

/// Ordered rules; each sees the output of the previous one
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<ReplacementRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<ReplacementRule>) -> Self {
        RuleSet { rules }
    }

    pub fn from_config(set: &ReplaceSet) -> RewriteResult<Self> {
        let rules = set
            .rules
            .iter()
            .map(|rule| ReplacementRule::new(&rule.from, rule.to.clone(), rule.all))
            .collect::<RewriteResult<Vec<_>>>()?;
        Ok(RuleSet { rules })
    }

    pub fn apply(&self, text: &str) -> String {
        self.rules
            .iter()
            .fold(text.to_string(), |acc, rule| rule.apply(&acc))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Rewrite every file in place and return the files whose contents changed
///
/// All targets must exist and every rewrite is computed before anything is written, so
/// a failure leaves all files untouched. The rules must be idempotent: applying them to
/// their own output may not change it again.
pub fn rewrite_references(files: &[PathBuf], rules: &RuleSet) -> RewriteResult<Vec<PathBuf>> {
    if let Some(missing) = files.iter().find(|file| !file.is_file()) {
        return Err(RewriteError::TargetMissing(missing.clone()));
    }

    let mut pending = Vec::new();
    for file in files {
        let original = read(file)?;
        let rewritten = rules.apply(&original);
        if rules.apply(&rewritten) != rewritten {
            return Err(RewriteError::NotIdempotent(file.clone()));
        }
        if rewritten == original {
            tracing::debug!("{} already up to date", file.display());
        } else {
            pending.push((file, rewritten));
        }
    }

    let mut changed = Vec::new();
    for (file, rewritten) in pending {
        fs::write(file, &rewritten).map_err(|e| RewriteError::Io {
            path: file.clone(),
            error: e.to_string(),
        })?;
        tracing::info!("Rewrote {}", file.display());
        changed.push(file.clone());
    }
    Ok(changed)
}

fn read(path: &Path) -> RewriteResult<String> {
    fs::read_to_string(path).map_err(|e| RewriteError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}
