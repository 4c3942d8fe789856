//! Voice session configuration types.

use serde::{Deserialize, Serialize};

/// How the microphone gate opens while in a session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoiceMode {
    /// Capture is open only while the push-to-talk key is held.
    Ptt,
    /// Capture is open whenever the user is unmuted.
    #[default]
    Vad,
}

/// Push-to-talk settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PttConfig {
    pub key: String,
}

impl Default for PttConfig {
    fn default() -> Self {
        Self {
            key: "Backquote".into(),
        }
    }
}

/// Voice session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub mode: VoiceMode,
    pub ptt: PttConfig,
    /// How long a join may wait for confirmation before it is abandoned.
    pub join_timeout_ms: u64,
    /// Local input level at or above which the user counts as speaking.
    pub speaking_threshold: f64,
    /// How long the level must stay below threshold before speaking clears.
    pub speaking_release_ms: u64,
    /// Interval between local input level samples.
    pub level_poll_ms: u64,
    /// Debounce before re-acquiring the microphone (valid range: 250-400).
    pub mic_recovery_debounce_ms: u64,
    /// Start timestamps closer to "now" than this are treated as clock drift
    /// when nobody else is in the channel.
    pub session_drift_window_ms: u64,
    /// Interval of the elapsed-time display tick.
    pub session_tick_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            mode: VoiceMode::Vad,
            ptt: PttConfig::default(),
            join_timeout_ms: 10_000,
            speaking_threshold: 0.08,
            speaking_release_ms: 300,
            level_poll_ms: 50,
            mic_recovery_debounce_ms: 300,
            session_drift_window_ms: 120_000,
            session_tick_ms: 1_000,
        }
    }
}
