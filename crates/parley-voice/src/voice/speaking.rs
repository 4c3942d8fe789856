//! Threshold-with-hold speaking detection.

use std::time::Duration;

use tokio::time::Instant;

/// Flags speaking as soon as the level reaches the threshold and clears it
/// only after the level stays below for the release period.
#[derive(Debug, Clone)]
pub struct SpeakingDetector {
    threshold: f64,
    release: Duration,
    speaking: bool,
    below_since: Option<Instant>,
}

impl SpeakingDetector {
    pub fn new(threshold: f64, release: Duration) -> Self {
        Self {
            threshold,
            release,
            speaking: false,
            below_since: None,
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Feed one level sample. Returns the new flag when it changed.
    pub fn update(&mut self, level: f64, now: Instant) -> Option<bool> {
        if level >= self.threshold {
            self.below_since = None;
            if !self.speaking {
                self.speaking = true;
                return Some(true);
            }
            return None;
        }

        if !self.speaking {
            return None;
        }
        let since = *self.below_since.get_or_insert(now);
        if now.duration_since(since) >= self.release {
            self.speaking = false;
            self.below_since = None;
            return Some(false);
        }
        None
    }

    /// Force the flag off. Returns `true` if it was on.
    pub fn reset(&mut self) -> bool {
        self.below_since = None;
        std::mem::replace(&mut self.speaking, false)
    }
}
