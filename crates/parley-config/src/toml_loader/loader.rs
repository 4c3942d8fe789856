//! Reading a config file into a `ParleyConfig`.

use std::io::ErrorKind;
use std::path::Path;

use crate::schema::ParleyConfig;
use crate::validation;
use parley_common::ConfigError;
use tracing::{info, warn};

use super::paths::{create_default_config, default_config_path};

/// Parse TOML text. Missing sections and fields take their defaults.
pub fn parse_config(content: &str) -> Result<ParleyConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))
}

/// Load the config at `path`.
///
/// A file that parses but fails validation is still returned; the
/// violations are logged so the session can start with what the user wrote.
pub fn load_from_path(path: &Path) -> Result<ParleyConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Err(e) => {
            return Err(ConfigError::ParseError(format!(
                "failed to read {}: {e}",
                path.display()
            )));
        }
    };

    let config = parse_config(&content)?;
    if let Err(e) = validation::validate(&config) {
        warn!(path = %path.display(), error = %e, "Config has out-of-range values; using them as written");
    }

    info!(path = %path.display(), "Config loaded");
    Ok(config)
}

/// Load from the platform default path, writing the template there first
/// if nothing exists yet.
pub fn load_default() -> Result<ParleyConfig, ConfigError> {
    let path = default_config_path()?;
    match load_from_path(&path) {
        Err(ConfigError::FileNotFound(_)) => {
            create_default_config(&path)?;
            Ok(ParleyConfig::default())
        }
        other => other,
    }
}
