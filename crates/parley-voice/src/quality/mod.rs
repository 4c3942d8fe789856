//! Connection quality monitoring.
//!
//! Transport counters are sampled on a fixed interval, turned into loss,
//! jitter, and bitrate, and scored with a simplified E-model. The model's
//! constants come from `[quality.mos]` in the config.

mod monitor;
mod mos;

pub use monitor::{ConnectionStats, PeerQuality, QualityMonitor, QualityReport, QualityUpdate};
pub use mos::{estimate_mos, mos_from_r, r_factor, QualityBucket};
