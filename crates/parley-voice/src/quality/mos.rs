//! Simplified E-model: transport metrics to an R-factor to a 1-5 MOS.

use parley_config::{BucketThresholds, MosConfig};
use serde::Serialize;

/// Coarse quality indication for the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityBucket {
    Excellent,
    Good,
    Fair,
    Poor,
    /// No round-trip measurement yet.
    #[default]
    Unknown,
}

impl QualityBucket {
    pub fn from_mos(mos: f64, thresholds: &BucketThresholds) -> Self {
        if mos >= thresholds.excellent {
            Self::Excellent
        } else if mos >= thresholds.good {
            Self::Good
        } else if mos >= thresholds.fair {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    /// Lower is worse. `Unknown` ranks above everything so it never wins a
    /// worst-of comparison.
    pub(crate) fn rank(self) -> u8 {
        match self {
            Self::Poor => 0,
            Self::Fair => 1,
            Self::Good => 2,
            Self::Excellent => 3,
            Self::Unknown => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::Unknown => "unknown",
        }
    }
}

/// Transmission rating factor in `[0, 100]`.
///
/// `loss_pct` is a percentage (0-100). Negative inputs count as zero.
pub fn r_factor(rtt_ms: f64, loss_pct: f64, jitter_ms: f64, model: &MosConfig) -> f64 {
    let one_way = rtt_ms.max(0.0) / 2.0;
    let mut delay = model.delay_coefficient * one_way;
    if one_way > model.delay_knee_ms {
        delay += model.delay_knee_coefficient * (one_way - model.delay_knee_ms);
    }

    let loss_fraction = (loss_pct.max(0.0) / 100.0).min(1.0);
    let loss = model.loss_coefficient * (1.0 + model.loss_scale * loss_fraction).ln();

    let jitter = model.jitter_coefficient * jitter_ms.max(0.0);

    (model.base_r - delay - loss - jitter).clamp(0.0, 100.0)
}

/// Empirical R to MOS mapping, clamped to `[1, 5]`.
pub fn mos_from_r(r: f64) -> f64 {
    let r = r.clamp(0.0, 100.0);
    let mos = 1.0 + 0.035 * r + 7.0e-6 * r * (r - 60.0) * (100.0 - r);
    mos.clamp(1.0, 5.0)
}

pub fn estimate_mos(rtt_ms: f64, loss_pct: f64, jitter_ms: f64, model: &MosConfig) -> f64 {
    mos_from_r(r_factor(rtt_ms, loss_pct, jitter_ms, model))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_network_scores_near_top() {
        let mos = estimate_mos(0.0, 0.0, 0.0, &MosConfig::default());
        assert!(mos > 4.4 && mos <= 4.5, "got {mos}");
    }

    #[test]
    fn bad_network_is_poor() {
        let model = MosConfig::default();
        let mos = estimate_mos(400.0, 10.0, 100.0, &model);
        assert!(mos < 3.1, "got {mos}");
        assert_eq!(
            QualityBucket::from_mos(mos, &BucketThresholds::default()),
            QualityBucket::Poor
        );
    }

    #[test]
    fn delay_penalty_steepens_past_knee() {
        let model = MosConfig::default();
        let below = r_factor(300.0, 0.0, 0.0, &model) - r_factor(340.0, 0.0, 0.0, &model);
        let above = r_factor(400.0, 0.0, 0.0, &model) - r_factor(440.0, 0.0, 0.0, &model);
        assert!(above > below);
    }

    #[test]
    fn r_factor_is_clamped() {
        let model = MosConfig::default();
        assert_eq!(r_factor(10_000.0, 100.0, 1_000.0, &model), 0.0);
        assert_eq!(mos_from_r(0.0), 1.0);
        assert_eq!(mos_from_r(250.0), mos_from_r(100.0));
    }

    #[test]
    fn typical_call_is_excellent() {
        let mos = estimate_mos(50.0, 0.0, 5.0, &MosConfig::default());
        assert_eq!(
            QualityBucket::from_mos(mos, &BucketThresholds::default()),
            QualityBucket::Excellent
        );
    }

    #[test]
    fn buckets_follow_thresholds() {
        let t = BucketThresholds::default();
        assert_eq!(QualityBucket::from_mos(4.0, &t), QualityBucket::Excellent);
        assert_eq!(QualityBucket::from_mos(3.7, &t), QualityBucket::Good);
        assert_eq!(QualityBucket::from_mos(3.1, &t), QualityBucket::Fair);
        assert_eq!(QualityBucket::from_mos(3.0, &t), QualityBucket::Poor);
    }
}
