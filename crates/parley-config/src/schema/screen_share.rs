use serde::{Deserialize, Serialize};

/// Screen sharing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenShareConfig {
    /// Minimum spacing between repeated viewer join requests (at least 1500).
    pub viewer_join_interval_ms: u64,
}

impl Default for ScreenShareConfig {
    fn default() -> Self {
        Self {
            viewer_join_interval_ms: 1_500,
        }
    }
}
