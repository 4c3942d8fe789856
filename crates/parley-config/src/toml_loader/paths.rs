//! Where the config file lives, and writing the commented template.

use std::path::{Path, PathBuf};

use parley_common::ConfigError;
use tracing::info;

use super::template::default_config_toml;

const APP_DIR: &str = "parley";
const FILE_NAME: &str = "config.toml";

/// `<os config dir>/parley/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(FILE_NAME))
        .ok_or_else(|| ConfigError::ParseError("no config directory on this platform".into()))
}

/// Write the template to `path`, creating parent directories. Overwrites
/// an existing file.
pub fn create_default_config(path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error("create", parent, e))?;
    }
    std::fs::write(path, default_config_toml()).map_err(|e| io_error("write", path, e))?;

    info!(path = %path.display(), "Default config written");
    Ok(())
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> ConfigError {
    ConfigError::ParseError(format!("failed to {action} {}: {e}", path.display()))
}
