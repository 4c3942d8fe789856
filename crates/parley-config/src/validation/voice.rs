//! Validation for the voice and screen share sections.

use crate::schema::{ParleyConfig, VoiceMode};

use super::helpers::{validate_range, validate_range_f64};

/// Validate voice session constraints.
pub(crate) fn validate_voice(errors: &mut Vec<String>, config: &ParleyConfig) {
    let voice = &config.voice;
    validate_range(errors, "voice.join_timeout_ms", voice.join_timeout_ms, 1_000, 60_000);
    validate_range_f64(
        errors,
        "voice.speaking_threshold",
        voice.speaking_threshold,
        0.0,
        1.0,
    );
    validate_range(
        errors,
        "voice.speaking_release_ms",
        voice.speaking_release_ms,
        0,
        5_000,
    );
    validate_range(errors, "voice.level_poll_ms", voice.level_poll_ms, 10, 1_000);
    validate_range(
        errors,
        "voice.mic_recovery_debounce_ms",
        voice.mic_recovery_debounce_ms,
        250,
        400,
    );
    validate_range(
        errors,
        "voice.session_drift_window_ms",
        voice.session_drift_window_ms,
        0,
        600_000,
    );
    validate_range(errors, "voice.session_tick_ms", voice.session_tick_ms, 100, 60_000);

    if voice.mode == VoiceMode::Ptt && voice.ptt.key.trim().is_empty() {
        errors.push("voice.ptt.key must be set when voice.mode = \"ptt\"".into());
    }
}

/// Validate screen share constraints.
pub(crate) fn validate_screen_share(errors: &mut Vec<String>, config: &ParleyConfig) {
    validate_range(
        errors,
        "screen_share.viewer_join_interval_ms",
        config.screen_share.viewer_join_interval_ms,
        1_500,
        60_000,
    );
}
