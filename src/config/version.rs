//! Package version record

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Package name and semantic version read from the project's JSON manifest
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VersionRecord {
    pub name: String,
    pub version: String,
}

impl VersionRecord {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        VersionRecord {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Read `name` and `version` from a JSON file; other fields are ignored
    pub fn read(path: &Path) -> ConfigResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::VersionRecord {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        serde_json::from_str(&contents).map_err(|e| ConfigError::VersionRecord {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Directory name used for namespaced distributables
    pub fn namespaced(&self) -> String {
        format!("{}-{}", self.name, self.version)
    }
}
