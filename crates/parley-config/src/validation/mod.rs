//! Full configuration validation.
//!
//! Each domain has its own submodule; this orchestrator calls them all
//! and collects errors into a single `ConfigError`.

mod helpers;
mod quality;
mod voice;

#[cfg(test)]
mod tests;

use crate::schema::ParleyConfig;
use parley_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &ParleyConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    voice::validate_voice(&mut errors, config);
    voice::validate_screen_share(&mut errors, config);
    quality::validate_quality(&mut errors, config);
    quality::validate_ice(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
