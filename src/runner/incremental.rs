//! Incremental filter
//!
//! Decides whether a leaf action's outputs are current relative to its inputs by
//! comparing modification times. The filter only reads storage; the executor writes
//! the stamp files used for actions that declare no destination.

use crate::config::Project;
use crate::runner::registry::LeafAction;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Outcome of an incremental check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Filtering is off for this action or globally
    Disabled,
    /// Sources are declared but none exist; the stage reports the error
    MissingSource,
    /// A declared destination does not exist
    MissingOutput,
    /// A source is newer than a destination
    Stale,
    /// Every destination is at least as new as every source
    UpToDate,
}

impl Decision {
    pub fn should_run(self) -> bool {
        !matches!(self, Decision::UpToDate)
    }

    pub fn reason(self) -> &'static str {
        match self {
            Decision::Disabled => "incremental check disabled",
            Decision::MissingSource => "sources missing",
            Decision::MissingOutput => "output missing",
            Decision::Stale => "sources changed",
            Decision::UpToDate => "up to date",
        }
    }
}

/// Modification-time based up-to-date check
#[derive(Debug, Clone)]
pub struct IncrementalFilter {
    root: PathBuf,
    stamp_dir: PathBuf,
    enabled: bool,
}

impl IncrementalFilter {
    pub fn new(project: &Project) -> Self {
        IncrementalFilter {
            root: project.root.clone(),
            stamp_dir: project.cache_dir.join("stamps"),
            enabled: true,
        }
    }

    /// Turn the filter off for every action
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the action must run
    pub fn should_run(&self, action: &LeafAction) -> bool {
        self.decide(action).should_run()
    }

    /// Full decision for an action
    pub fn decide(&self, action: &LeafAction) -> Decision {
        if !self.enabled || !action.incremental {
            return Decision::Disabled;
        }

        let newest_src = action
            .src
            .iter()
            .flat_map(|pattern| self.expand(pattern))
            .filter_map(|path| modified(&path))
            .max();
        if !action.src.is_empty() && newest_src.is_none() {
            return Decision::MissingSource;
        }

        let mut dest_times = Vec::new();
        if action.dest.is_empty() {
            match modified(&self.stamp_path(action)) {
                Some(time) => dest_times.push(time),
                None => return Decision::MissingOutput,
            }
        } else {
            for pattern in &action.dest {
                match self.destination_time(pattern) {
                    Some(time) => dest_times.push(time),
                    None => return Decision::MissingOutput,
                }
            }
        }

        let oldest_dest = dest_times.into_iter().min();

        match (newest_src, oldest_dest) {
            (Some(src), Some(dest)) if src > dest => Decision::Stale,
            _ => Decision::UpToDate,
        }
    }

    /// Stamp file standing in for the output of an action without destinations
    pub fn stamp_path(&self, action: &LeafAction) -> PathBuf {
        let file_name: String = action
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.stamp_dir.join(file_name)
    }

    fn absolute(&self, pattern: &str) -> String {
        let path = Path::new(pattern);
        if path.is_absolute() {
            pattern.to_string()
        } else {
            self.root.join(path).to_string_lossy().into_owned()
        }
    }

    /// Every file matched by a pattern; directories contribute their files
    fn expand(&self, pattern: &str) -> Vec<PathBuf> {
        let Ok(paths) = glob::glob(&self.absolute(pattern)) else {
            return Vec::new();
        };
        paths
            .flatten()
            .flat_map(|path| {
                if path.is_dir() {
                    files_under(&path)
                } else {
                    vec![path]
                }
            })
            .collect()
    }

    /// Oldest match of a destination pattern, a directory counting as its newest file
    fn destination_time(&self, pattern: &str) -> Option<SystemTime> {
        let paths: Vec<PathBuf> = glob::glob(&self.absolute(pattern)).ok()?.flatten().collect();
        paths
            .iter()
            .map(|path| {
                if path.is_dir() {
                    files_under(path).iter().filter_map(|f| modified(f)).max()
                } else {
                    modified(path)
                }
            })
            .collect::<Option<Vec<_>>>()?
            .into_iter()
            .min()
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let pattern = dir.join("**").join("*");
    glob::glob(&pattern.to_string_lossy())
        .map(|paths| paths.flatten().filter(|p| p.is_file()).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ActionKind;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn filter(dir: &TempDir) -> IncrementalFilter {
        IncrementalFilter {
            root: dir.path().to_path_buf(),
            stamp_dir: dir.path().join(".assetrun/stamps"),
            enabled: true,
        }
    }

    fn touch(path: &Path, time: SystemTime) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "x").unwrap();
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn compile_action() -> LeafAction {
        LeafAction::new("sass", ActionKind::Compile)
            .with_src(["scss/*.scss"])
            .with_dest(["dist/styles.css"])
    }

    #[test]
    fn test_missing_destination_runs() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("scss/a.scss"), SystemTime::now());
        assert_eq!(filter(&dir).decide(&compile_action()), Decision::MissingOutput);
    }

    #[test]
    fn test_up_to_date_skips() {
        let dir = TempDir::new().unwrap();
        let base = SystemTime::now() - Duration::from_secs(100);
        touch(&dir.path().join("scss/a.scss"), base);
        touch(&dir.path().join("scss/b.scss"), base + Duration::from_secs(10));
        touch(&dir.path().join("dist/styles.css"), base + Duration::from_secs(10));
        assert!(!filter(&dir).should_run(&compile_action()));
    }

    #[test]
    fn test_newer_source_runs() {
        let dir = TempDir::new().unwrap();
        let base = SystemTime::now() - Duration::from_secs(100);
        touch(&dir.path().join("dist/styles.css"), base);
        touch(&dir.path().join("scss/a.scss"), base - Duration::from_secs(10));
        touch(&dir.path().join("scss/b.scss"), base + Duration::from_secs(1));
        assert_eq!(filter(&dir).decide(&compile_action()), Decision::Stale);
    }

    #[test]
    fn test_any_stale_destination_runs() {
        let dir = TempDir::new().unwrap();
        let base = SystemTime::now() - Duration::from_secs(100);
        touch(&dir.path().join("js/a.js"), base);
        touch(&dir.path().join("dist/scripts.js"), base + Duration::from_secs(5));
        touch(&dir.path().join("dist/scripts.min.js"), base - Duration::from_secs(5));
        let action = LeafAction::new("uglify", ActionKind::Bundle)
            .with_src(["js/*.js"])
            .with_dest(["dist/scripts.js", "dist/scripts.min.js"]);
        assert!(filter(&dir).should_run(&action));
    }

    #[test]
    fn test_vanished_sources_run() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("dist/styles.css"), SystemTime::now());
        let decision = filter(&dir).decide(&compile_action());
        assert_eq!(decision, Decision::MissingSource);
        assert!(decision.should_run());
    }

    #[test]
    fn test_disabled_always_runs() {
        let dir = TempDir::new().unwrap();
        let base = SystemTime::now() - Duration::from_secs(100);
        touch(&dir.path().join("scss/a.scss"), base);
        touch(&dir.path().join("dist/styles.css"), base + Duration::from_secs(5));

        let action = compile_action().with_incremental(false);
        assert_eq!(filter(&dir).decide(&action), Decision::Disabled);
        assert!(filter(&dir)
            .with_enabled(false)
            .should_run(&compile_action()));
    }

    #[test]
    fn test_stamp_for_actions_without_destination() {
        let dir = TempDir::new().unwrap();
        let filter = filter(&dir);
        let base = SystemTime::now() - Duration::from_secs(100);
        touch(&dir.path().join("js/a.js"), base);

        let action = LeafAction::new("jshint:all", ActionKind::ScriptLint).with_src(["js/*.js"]);
        assert_eq!(filter.decide(&action), Decision::MissingOutput);

        let stamp = filter.stamp_path(&action);
        assert!(stamp.ends_with("jshint_all"));
        touch(&stamp, base + Duration::from_secs(1));
        assert_eq!(filter.decide(&action), Decision::UpToDate);
    }

    #[test]
    fn test_directory_destination_uses_newest_file() {
        let dir = TempDir::new().unwrap();
        let base = SystemTime::now() - Duration::from_secs(100);
        touch(&dir.path().join("scss/a.scss"), base);
        touch(&dir.path().join("doc/old.html"), base - Duration::from_secs(50));
        touch(&dir.path().join("doc/index.html"), base + Duration::from_secs(1));

        let action = LeafAction::new("docs", ActionKind::Docs)
            .with_src(["scss"])
            .with_dest(["doc"]);
        assert_eq!(filter(&dir).decide(&action), Decision::UpToDate);
    }
}
