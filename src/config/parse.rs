//! Configuration file parsing and discovery

use crate::config::types::Config;
use crate::error::{AssetRunError, ConfigError, ConfigResult};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file names to search for
const CONFIG_FILE_NAMES: &[&str] = &["assetrun.yml", "assetrun.yaml"];

/// Find the configuration file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the configuration file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Parse a configuration file from a path
pub fn parse_config_file(path: &Path) -> Result<Config, AssetRunError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e)))?;

    parse_config(&contents)
}

/// Parse configuration from a string
pub fn parse_config(yaml: &str) -> Result<Config, AssetRunError> {
    let config: Config = serde_yaml::from_str(yaml)?;
    Ok(config)
}

/// Load a `.env` file next to the configuration file into the process environment
///
/// Variables already present in the environment win.
pub fn load_dotenv(config_path: &Path) {
    let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let dotenv = dir.join(".env");
    if dotenv.is_file() {
        match dotenvy::from_path(&dotenv) {
            Ok(()) => tracing::debug!("Loaded environment from {}", dotenv.display()),
            Err(e) => tracing::warn!("Ignoring {}: {}", dotenv.display(), e),
        }
    }
}
