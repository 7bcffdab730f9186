//! Error types for assetrun

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for assetrun operations
pub type Result<T> = std::result::Result<T, AssetRunError>;

/// Main error type for assetrun
#[derive(Error, Debug)]
pub enum AssetRunError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Plan execution errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// External tool failures
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// File system errors raised by pipeline and packaging steps
    #[error("File system error: {0}")]
    Fs(#[from] FsError),

    /// Reference rewriting errors
    #[error("Rewrite error: {0}")]
    Rewrite(#[from] RewriteError),

    /// Release errors
    #[error("Release error: {0}")]
    Release(#[from] ReleaseError),

    /// File watcher errors
    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl AssetRunError {
    /// The error kind reported to the invoker
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssetRunError::Config(_) | AssetRunError::Yaml(_) => ErrorKind::Configuration,
            AssetRunError::Tool(_) => ErrorKind::ToolInvocation,
            AssetRunError::Rewrite(RewriteError::TargetMissing(_)) => {
                ErrorKind::ReplacementTargetMissing
            }
            AssetRunError::Rewrite(RewriteError::InvalidPattern { .. }) => {
                ErrorKind::Configuration
            }
            AssetRunError::Release(ReleaseError::VersionFormat(_)) => ErrorKind::VersionFormat,
            AssetRunError::Release(ReleaseError::Vcs(_)) => ErrorKind::ToolInvocation,
            AssetRunError::Watch(WatchError::Pattern { .. }) => ErrorKind::Configuration,
            AssetRunError::Execution(ExecutionError::PlanFailed { kind, .. }) => *kind,
            _ => ErrorKind::FileSystem,
        }
    }
}

/// Error classification used in run reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ErrorKind {
    #[serde(rename = "ConfigurationError")]
    Configuration,
    #[serde(rename = "ToolInvocationError")]
    ToolInvocation,
    #[serde(rename = "FileSystemError")]
    FileSystem,
    #[serde(rename = "ReplacementTargetMissingError")]
    ReplacementTargetMissing,
    #[serde(rename = "VersionFormatError")]
    VersionFormat,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::ToolInvocation => "ToolInvocationError",
            ErrorKind::FileSystem => "FileSystemError",
            ErrorKind::ReplacementTargetMissing => "ReplacementTargetMissingError",
            ErrorKind::VersionFormat => "VersionFormatError",
        };
        f.write_str(name)
    }
}

/// Configuration parsing, resolution and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find config file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unresolved reference '${{{reference}}}' in '{template}'")]
    UnresolvedReference { reference: String, template: String },

    #[error("Cyclic reference while resolving '{0}'")]
    CyclicReference(String),

    #[error("Task '{0}' is not defined")]
    UnknownTask(String),

    #[error("Circular task reference detected: {0}")]
    CyclicTask(String),

    #[error("Failed to read version record '{path}': {error}")]
    VersionRecord { path: PathBuf, error: String },

    #[error("Invalid pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },
}

/// A collaborator reported failure
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{tool} failed: {message}")]
    Failed { tool: String, message: String },

    #[error("{tool} reported {count} violation(s), threshold is {threshold}")]
    LintThreshold {
        tool: String,
        count: usize,
        threshold: usize,
    },

    #[error("No command configured for tool '{0}'")]
    NotConfigured(String),

    #[error("Failed to start {tool}: {error}")]
    Spawn { tool: String, error: String },
}

/// Storage errors raised by actions
#[derive(Error, Debug)]
pub enum FsError {
    #[error("Source not found: {0}")]
    MissingSource(String),

    #[error("Failed to copy '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    #[error("Failed to read '{path}': {error}")]
    Read { path: PathBuf, error: String },

    #[error("Failed to write '{path}': {error}")]
    Write { path: PathBuf, error: String },

    #[error("Failed to remove '{path}': {error}")]
    Remove { path: PathBuf, error: String },
}

/// Replacement rule errors
#[derive(Error, Debug)]
pub enum RewriteError {
    #[error("Replacement target not found: {0}")]
    TargetMissing(PathBuf),

    #[error("Invalid replacement pattern '{pattern}': {error}")]
    InvalidPattern { pattern: String, error: String },

    #[error("Replacement rules are not idempotent on '{0}': re-applying them changes the text")]
    NotIdempotent(PathBuf),

    #[error("Failed to rewrite '{path}': {error}")]
    Io { path: PathBuf, error: String },
}

/// Release errors
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("'{0}' is not a semantic version")]
    VersionFormat(String),

    #[error("No version field found in '{0}'")]
    MissingVersion(PathBuf),

    #[error("Failed to update '{path}': {error}")]
    Io { path: PathBuf, error: String },

    #[error("Version control step failed: {0}")]
    Vcs(ToolError),
}

/// File watcher errors
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(notify::Error),

    #[error("Failed to watch '{path}': {error}")]
    WatchPath { path: PathBuf, error: notify::Error },

    #[error("Invalid watch pattern '{pattern}': {error}")]
    Pattern { pattern: String, error: String },
}

/// Plan execution errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Action '{action}' failed ({kind}): {cause}")]
    PlanFailed {
        action: String,
        kind: ErrorKind,
        cause: String,
    },

    #[error("{0} action(s) failed")]
    Failures(usize),

    #[error("Operation '{0}' was interrupted")]
    Interrupted(String),
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for tool invocations
pub type ToolResult<T> = std::result::Result<T, ToolError>;

/// Specialized result type for rewrite operations
pub type RewriteResult<T> = std::result::Result<T, RewriteError>;

/// Specialized result type for release operations
pub type ReleaseResult<T> = std::result::Result<T, ReleaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err: AssetRunError = ConfigError::UnknownTask("x".into()).into();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err: AssetRunError = RewriteError::TargetMissing(PathBuf::from("a")).into();
        assert_eq!(err.kind(), ErrorKind::ReplacementTargetMissing);

        let err: AssetRunError = ReleaseError::VersionFormat("x".into()).into();
        assert_eq!(err.kind(), ErrorKind::VersionFormat);

        let err: AssetRunError = FsError::MissingSource("a.scss".into()).into();
        assert_eq!(err.kind(), ErrorKind::FileSystem);
    }

    #[test]
    fn test_unresolved_reference_message() {
        let err = ConfigError::UnresolvedReference {
            reference: "distPath".into(),
            template: "${distPath}a.css".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unresolved reference '${distPath}' in '${distPath}a.css'"
        );
    }
}
