//! Subcommand handlers. Each returns the text to print.

use std::path::{Path, PathBuf};

use parley_common::{ConfigError, ParleyError};
use parley_config::toml_loader::{create_default_config, default_config_path, load_from_path};
use parley_config::{config_to_toml, validation, ParleyConfig};
use parley_voice::quality::{mos_from_r, r_factor, QualityBucket};
use tracing::info;

use crate::cli::{Command, ConfigAction};

/// The explicit `--config` path, or the platform default.
pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path(),
    }
}

/// Read the config at `path`, falling back to defaults when no file exists.
pub fn load(path: &Path) -> Result<ParleyConfig, ConfigError> {
    match load_from_path(path) {
        Err(ConfigError::FileNotFound(_)) => Ok(ParleyConfig::default()),
        other => other,
    }
}

pub fn execute(command: Command, path: Result<PathBuf, ConfigError>) -> parley_common::Result<String> {
    let path = path?;
    match command {
        Command::Config { action } => config(action, &path),
        Command::Mos { rtt, loss, jitter } => mos(&load(&path)?, rtt, loss, jitter),
    }
}

fn config(action: ConfigAction, path: &Path) -> parley_common::Result<String> {
    match action {
        ConfigAction::Path => Ok(path.display().to_string()),
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                return Err(ParleyError::Other(format!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                )));
            }
            create_default_config(path)?;
            Ok(format!("wrote {}", path.display()))
        }
        ConfigAction::Show => Ok(config_to_toml(&load(path)?)),
        ConfigAction::Validate => {
            if !path.exists() {
                return Ok(format!("{} not found; defaults are in use", path.display()));
            }
            let config = load_from_path(path)?;
            validation::validate(&config)?;
            info!(path = %path.display(), "Config valid");
            Ok(format!("{} is valid", path.display()))
        }
    }
}

fn mos(config: &ParleyConfig, rtt: f64, loss: f64, jitter: f64) -> parley_common::Result<String> {
    for (name, value) in [("rtt", rtt), ("loss", loss), ("jitter", jitter)] {
        if !value.is_finite() || value < 0.0 {
            return Err(ParleyError::Other(format!(
                "--{name} must be a non-negative number, got {value}"
            )));
        }
    }
    let r = r_factor(rtt, loss, jitter, &config.quality.mos);
    let mos = mos_from_r(r);
    let bucket = QualityBucket::from_mos(mos, &config.quality.buckets);
    Ok(format!("R={r:.1} MOS={mos:.2} ({})", bucket.label()))
}
