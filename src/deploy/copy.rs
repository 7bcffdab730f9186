//! Packaging: namespaced distributables, documentation history, cleaning

use crate::config::{CopyRuleDef, Project, VersionRecord};
use crate::error::{FsError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Copy one file, creating the destination's parent directories
pub fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let copy = || -> std::io::Result<()> {
        if let Some(parent) = to.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(from, to).map(|_| ())
    };
    copy().map_err(|e| {
        FsError::Copy {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            error: e.to_string(),
        }
        .into()
    })
}

fn glob_paths(pattern: &Path) -> Vec<PathBuf> {
    match glob::glob(&pattern.to_string_lossy()) {
        Ok(paths) => paths.flatten().collect(),
        Err(e) => {
            tracing::warn!("Invalid pattern {}: {}", pattern.display(), e);
            Vec::new()
        }
    }
}

/// Copy every file under `dist_dir`, flattened, into `<dist_dir>/<name>-<version>/`
///
/// Top-level directories named `<name>-*` are earlier packages and are not copied.
/// When two files share a name, the last one in sorted path order wins.
pub fn package_dist(dist_dir: &Path, record: &VersionRecord) -> Result<(PathBuf, Vec<PathBuf>)> {
    if !dist_dir.is_dir() {
        return Err(FsError::MissingSource(dist_dir.display().to_string()).into());
    }

    let dest_dir = dist_dir.join(record.namespaced());
    let package_prefix = format!("{}-", record.name);

    fs::create_dir_all(&dest_dir).map_err(|e| FsError::Copy {
        from: dist_dir.to_path_buf(),
        to: dest_dir.clone(),
        error: e.to_string(),
    })?;

    let mut files: Vec<PathBuf> = glob_paths(&dist_dir.join("**").join("*"))
        .into_iter()
        .filter(|path| path.is_file())
        .filter(|path| !inside_package_dir(dist_dir, path, &package_prefix))
        .collect();
    files.sort();

    let mut copied = Vec::new();
    for file in &files {
        let Some(name) = file.file_name() else {
            continue;
        };
        let target = dest_dir.join(name);
        copy_file(file, &target)?;
        copied.push(target);
    }

    tracing::info!(
        "Packaged {} file(s) into {}",
        copied.len(),
        dest_dir.display()
    );
    Ok((dest_dir, copied))
}

fn inside_package_dir(dist_dir: &Path, path: &Path, prefix: &str) -> bool {
    let Ok(relative) = path.strip_prefix(dist_dir) else {
        return false;
    };
    let mut components = relative.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(first)), Some(_)) => first.to_string_lossy().starts_with(prefix),
        _ => false,
    }
}

/// Apply a copy rule; `dest` is joined onto `dest_base`
///
/// Only files are copied. Paths keep their structure relative to `cwd` unless the rule
/// flattens them.
pub fn copy_rule(root: &Path, rule: &CopyRuleDef, dest_base: &Path) -> Result<Vec<PathBuf>> {
    let base = match &rule.cwd {
        Some(cwd) => root.join(cwd),
        None => root.to_path_buf(),
    };
    let dest_dir = dest_base.join(&rule.dest);

    let mut copied = Vec::new();
    for pattern in &rule.src {
        for path in glob_paths(&base.join(pattern)) {
            if !path.is_file() {
                continue;
            }
            let relative = if rule.flatten {
                match path.file_name() {
                    Some(name) => PathBuf::from(name),
                    None => continue,
                }
            } else {
                path.strip_prefix(&base).unwrap_or(&path).to_path_buf()
            };
            let target = dest_dir.join(relative);
            copy_file(&path, &target)?;
            copied.push(target);
        }
    }
    Ok(copied)
}

/// Copy documentation and distributables into the version-keyed history directory and
/// the documentation entry point to the top level; existing files are overwritten
pub fn archive_docs(project: &Project) -> Result<Vec<PathBuf>> {
    let archive = &project.archive;
    let history = project.path(&archive.history_dir);

    let mut copied = Vec::new();
    for rule in &archive.copy {
        copied.extend(copy_rule(&project.root, rule, &history)?);
    }

    if let Some(entry_point) = &archive.entry_point {
        let entry = project.path(entry_point);
        if !entry.is_file() {
            return Err(FsError::MissingSource(entry.display().to_string()).into());
        }
        if let Some(name) = entry.file_name() {
            let archived = history.join(name);
            copy_file(&entry, &archived)?;
            copied.push(archived);
        }
        let top_level = project.path(&archive.top_level);
        copy_file(&entry, &top_level)?;
        copied.push(top_level);
    }

    tracing::info!("Archived {} file(s) into {}", copied.len(), history.display());
    Ok(copied)
}

/// Delete every file or directory matched by the patterns; missing paths are fine
pub fn clean(project: &Project, patterns: &[String]) -> Result<usize> {
    let mut removed = 0;
    for pattern in patterns {
        for path in glob_paths(&project.path(pattern)) {
            let result = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            result.map_err(|e| FsError::Remove {
                path: path.clone(),
                error: e.to_string(),
            })?;
            tracing::debug!("Removed {}", path.display());
            removed += 1;
        }
    }
    Ok(removed)
}
