//! Release coordination: semantic version bumping and version control follow-ups

use crate::config::{resolve, Project};
use crate::error::{ConfigError, ReleaseError, ReleaseResult, Result};
use crate::tools::VersionControl;
use regex::Regex;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

/// Which part of the version to increment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BumpStrategy {
    Major,
    Minor,
    #[default]
    Patch,
    Prerelease,
}

impl FromStr for BumpStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "major" => Ok(BumpStrategy::Major),
            "minor" => Ok(BumpStrategy::Minor),
            "patch" => Ok(BumpStrategy::Patch),
            "prerelease" => Ok(BumpStrategy::Prerelease),
            other => Err(ConfigError::Invalid(format!(
                "Unknown bump strategy '{}' (expected major, minor, patch or prerelease)",
                other
            ))),
        }
    }
}

/// A `MAJOR.MINOR.PATCH[-PRERELEASE][+BUILD]` version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub pre: Vec<String>,
}

impl Version {
    pub fn parse(text: &str) -> ReleaseResult<Self> {
        let invalid = || ReleaseError::VersionFormat(text.to_string());

        let trimmed = text.trim();
        let core_and_pre = trimmed.split('+').next().unwrap_or_default();
        let (core, pre) = match core_and_pre.split_once('-') {
            Some((core, pre)) => (core, Some(pre)),
            None => (core_and_pre, None),
        };

        let numbers = core
            .split('.')
            .map(parse_number)
            .collect::<Option<Vec<u64>>>()
            .ok_or_else(invalid)?;
        let &[major, minor, patch] = numbers.as_slice() else {
            return Err(invalid());
        };

        let pre = match pre {
            Some(pre) => {
                let parts: Vec<String> = pre.split('.').map(str::to_string).collect();
                let valid = parts.iter().all(|p| {
                    !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                });
                if !valid {
                    return Err(invalid());
                }
                parts
            }
            None => Vec::new(),
        };

        Ok(Version {
            major,
            minor,
            patch,
            pre,
        })
    }

    /// Next version; a prerelease of the target version is promoted instead of skipped
    pub fn bump(&self, strategy: BumpStrategy) -> Version {
        let mut next = self.clone();
        let is_pre = !self.pre.is_empty();
        next.pre.clear();

        match strategy {
            BumpStrategy::Major => {
                if !(is_pre && self.minor == 0 && self.patch == 0) {
                    next.major += 1;
                }
                next.minor = 0;
                next.patch = 0;
            }
            BumpStrategy::Minor => {
                if !(is_pre && self.patch == 0) {
                    next.minor += 1;
                }
                next.patch = 0;
            }
            BumpStrategy::Patch => {
                if !is_pre {
                    next.patch += 1;
                }
            }
            BumpStrategy::Prerelease => {
                if is_pre {
                    next.pre = self.pre.clone();
                    match next.pre.iter().rposition(|p| parse_number(p).is_some()) {
                        Some(i) => {
                            let n = parse_number(&next.pre[i]).unwrap_or_default();
                            next.pre[i] = (n + 1).to_string();
                        }
                        None => next.pre.push("0".to_string()),
                    }
                } else {
                    next.patch += 1;
                    next.pre = vec!["0".to_string()];
                }
            }
        }
        next
    }
}

fn parse_number(part: &str) -> Option<u64> {
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if part.len() > 1 && part.starts_with('0') {
        return None;
    }
    part.parse().ok()
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre.join("."))?;
        }
        Ok(())
    }
}

fn version_field_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"("version"\s*:\s*")([^"]*)(")"#).unwrap())
}

fn successor(text: &str, path: &Path, strategy: BumpStrategy) -> ReleaseResult<(String, String)> {
    let current = version_field_regex()
        .captures(text)
        .and_then(|caps| caps.get(2))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| ReleaseError::MissingVersion(path.to_path_buf()))?;
    let next = Version::parse(&current)?.bump(strategy).to_string();
    Ok((current, next))
}

/// Read the version in `version_file` and compute its successor
pub fn next_version(version_file: &Path, strategy: BumpStrategy) -> ReleaseResult<(String, String)> {
    successor(&read(version_file)?, version_file, strategy)
}

/// Rewrite the version field of the record in place and return the new version
///
/// The rest of the file is preserved byte for byte.
pub fn bump(version_file: &Path, strategy: BumpStrategy) -> ReleaseResult<String> {
    let text = read(version_file)?;
    let (current, next) = successor(&text, version_file, strategy)?;

    let replacement = format!("${{1}}{}${{3}}", next);
    let updated = version_field_regex().replace(&text, replacement.as_str());
    fs::write(version_file, updated.as_bytes()).map_err(|e| ReleaseError::Io {
        path: version_file.to_path_buf(),
        error: e.to_string(),
    })?;

    tracing::info!("Bumped version {} -> {}", current, next);
    Ok(next)
}

fn read(path: &Path) -> ReleaseResult<String> {
    fs::read_to_string(path).map_err(|e| ReleaseError::Io {
        path: path.to_path_buf(),
        error: e.to_string(),
    })
}

/// Run a release: bump (when enabled), then each enabled follow-up in order
///
/// With `bump` off the next version is still computed, which validates the record,
/// but nothing is written.
pub fn run_release(
    project: &Project,
    strategy: BumpStrategy,
    vcs: &dyn VersionControl,
) -> Result<String> {
    let options = &project.release;
    let file = match &options.file {
        Some(file) => project.path(file),
        None => project.package_file.clone(),
    };

    let version = if options.bump {
        bump(&file, strategy)?
    } else {
        let (current, next) = next_version(&file, strategy)?;
        tracing::info!("Version bump disabled; {} would become {}", current, next);
        current
    };

    let mut vars = project.settings.clone();
    vars.insert("version".to_string(), version.clone());
    let tag_name = resolve(&options.tag_name, &vars)?;

    if options.commit {
        let message = resolve(&options.commit_message, &vars)?;
        vcs.commit(&message).map_err(ReleaseError::Vcs)?;
    }
    if options.tag {
        let message = resolve(&options.tag_message, &vars)?;
        vcs.tag(&tag_name, &message).map_err(ReleaseError::Vcs)?;
    }
    if options.push {
        vcs.push().map_err(ReleaseError::Vcs)?;
    }
    if options.push_tags {
        vcs.push_tags().map_err(ReleaseError::Vcs)?;
    }
    if options.publish {
        vcs.publish().map_err(ReleaseError::Vcs)?;
    }

    Ok(version)
}
