use super::*;
use crate::schema::{IceServerConfig, VoiceMode};

#[test]
fn default_config_is_valid() {
    let config = ParleyConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn mic_recovery_debounce_out_of_range() {
    let mut config = ParleyConfig::default();
    config.voice.mic_recovery_debounce_ms = 100;
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("voice.mic_recovery_debounce_ms"));
}

#[test]
fn viewer_join_interval_below_minimum() {
    let mut config = ParleyConfig::default();
    config.screen_share.viewer_join_interval_ms = 500;
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("screen_share.viewer_join_interval_ms"));
}

#[test]
fn ptt_mode_requires_key() {
    let mut config = ParleyConfig::default();
    config.voice.mode = VoiceMode::Ptt;
    config.voice.ptt.key = "  ".into();
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("voice.ptt.key"));
}

#[test]
fn bucket_thresholds_must_be_ordered() {
    let mut config = ParleyConfig::default();
    config.quality.buckets.good = 4.5;
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("excellent >= good >= fair"));
}

#[test]
fn negative_mos_coefficient_rejected() {
    let mut config = ParleyConfig::default();
    config.quality.mos.jitter_coefficient = -1.0;
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("quality.mos.jitter_coefficient"));
}

#[test]
fn turn_server_without_credential_rejected() {
    let mut config = ParleyConfig::default();
    config.ice.servers.push(IceServerConfig {
        urls: vec!["turn:turn.example.com:3478".into()],
        username: Some("parley".into()),
        credential: None,
    });
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("without a credential"));
}

#[test]
fn unsupported_ice_url_rejected() {
    let mut config = ParleyConfig::default();
    config.ice.servers[0].urls = vec!["http://example.com".into()];
    let err = validate(&config).unwrap_err();
    assert!(err.to_string().contains("unsupported url"));
}

#[test]
fn multiple_errors_are_joined() {
    let mut config = ParleyConfig::default();
    config.voice.join_timeout_ms = 0;
    config.quality.stats_interval_ms = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("voice.join_timeout_ms"));
    assert!(err.contains("quality.stats_interval_ms"));
    assert!(err.contains("; "));
}
