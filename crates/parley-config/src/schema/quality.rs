//! Connection quality configuration: sampling and the E-model constants.

use serde::{Deserialize, Serialize};

/// Constants of the simplified E-model used to estimate MOS.
///
/// These are heuristic defaults, not a verified rendition of ITU-T G.107.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MosConfig {
    /// R-factor with no impairments.
    pub base_r: f64,
    /// Delay impairment per millisecond of one-way delay.
    pub delay_coefficient: f64,
    /// One-way delay above which the steeper penalty applies.
    pub delay_knee_ms: f64,
    /// Extra impairment per millisecond above the knee.
    pub delay_knee_coefficient: f64,
    /// Scale of the logarithmic loss impairment.
    pub loss_coefficient: f64,
    /// Multiplier applied to the loss fraction inside the logarithm.
    pub loss_scale: f64,
    /// Impairment per millisecond of jitter.
    pub jitter_coefficient: f64,
}

impl Default for MosConfig {
    fn default() -> Self {
        Self {
            base_r: 93.2,
            delay_coefficient: 0.024,
            delay_knee_ms: 177.3,
            delay_knee_coefficient: 0.11,
            loss_coefficient: 30.0,
            loss_scale: 15.0,
            jitter_coefficient: 0.05,
        }
    }
}

/// Minimum MOS for each quality bucket; anything below `fair` is poor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketThresholds {
    pub excellent: f64,
    pub good: f64,
    pub fair: f64,
}

impl Default for BucketThresholds {
    fn default() -> Self {
        Self {
            excellent: 4.0,
            good: 3.6,
            fair: 3.1,
        }
    }
}

/// Connection quality monitoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub stats_interval_ms: u64,
    pub mos: MosConfig,
    pub buckets: BucketThresholds,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            stats_interval_ms: 2_000,
            mos: MosConfig::default(),
            buckets: BucketThresholds::default(),
        }
    }
}
