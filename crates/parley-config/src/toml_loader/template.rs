//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Parley Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[voice]
# mode = "vad"                     # vad, ptt
# join_timeout_ms = 10000          # 1000-60000
# speaking_threshold = 0.08        # 0.0-1.0
# speaking_release_ms = 300
# level_poll_ms = 50               # 10-1000
# mic_recovery_debounce_ms = 300   # 250-400
# session_drift_window_ms = 120000
# session_tick_ms = 1000

[voice.ptt]
# key = "Backquote"

[screen_share]
# viewer_join_interval_ms = 1500   # >= 1500

[quality]
# stats_interval_ms = 2000

[quality.mos]
# base_r = 93.2
# delay_coefficient = 0.024
# delay_knee_ms = 177.3
# delay_knee_coefficient = 0.11
# loss_coefficient = 30.0
# loss_scale = 15.0
# jitter_coefficient = 0.05

[quality.buckets]
# excellent = 4.0
# good = 3.6
# fair = 3.1

[[ice.servers]]
urls = ["stun:stun.l.google.com:19302"]
# username = "user"
# credential = "secret"

[logging]
# filter = "parley=info"
"##
    .to_string()
}
