//! Parley configuration system.
//!
//! TOML-based configuration for the voice session, screen sharing, quality
//! estimation, ICE servers, and logging. All sections use defaults so
//! partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use parley_config::load_config;
//!
//! let config = load_config().expect("failed to load config");
//! println!("join timeout: {}ms", config.voice.join_timeout_ms);
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    BucketThresholds, IceConfig, IceServerConfig, LoggingConfig, MosConfig, ParleyConfig,
    PttConfig, QualityConfig, ScreenShareConfig, VoiceConfig, VoiceMode, CONFIG_SCHEMA_VERSION,
};

use parley_common::ConfigError;

/// Load config from the platform default path, creating it if missing,
/// and validate the result.
pub fn load_config() -> Result<ParleyConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed TOML string.
pub fn config_to_toml(config: &ParleyConfig) -> String {
    toml::to_string_pretty(config)
        .unwrap_or_else(|e| format!("# failed to serialize config: {e}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_to_toml_contains_all_sections() {
        let config = ParleyConfig::default();
        let text = config_to_toml(&config);
        assert!(text.contains("[voice]"));
        assert!(text.contains("[screen_share]"));
        assert!(text.contains("[quality]"));
        assert!(text.contains("[quality.mos]"));
        assert!(text.contains("[logging]"));
    }

    #[test]
    fn config_schema_version_is_1() {
        assert_eq!(CONFIG_SCHEMA_VERSION, 1);
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ParleyConfig::default();
        let text = config_to_toml(&config);
        let parsed: ParleyConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.voice.join_timeout_ms, 10_000);
        assert_eq!(parsed.screen_share.viewer_join_interval_ms, 1_500);
        assert_eq!(parsed.ice.servers.len(), config.ice.servers.len());
    }
}
