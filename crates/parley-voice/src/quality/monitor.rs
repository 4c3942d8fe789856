//! Per-peer quality tracking across sampling ticks.

use std::collections::HashMap;

use parley_config::QualityConfig;
use serde::Serialize;
use tracing::{debug, info};

use crate::peer::TransportStats;

use super::mos::{estimate_mos, QualityBucket};

/// Derived metrics for one peer at one sampling tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    pub round_trip_time_ms: Option<f64>,
    pub packet_loss_pct: f64,
    pub jitter_ms: f64,
    pub bitrate_bps: f64,
    pub timestamp: i64,
}

impl ConnectionStats {
    /// Derive rates from the current counters and the previous sample.
    /// Without a previous sample (or after a counter reset) the counters
    /// are taken as the delta and the bitrate is zero.
    pub fn from_counters(current: &TransportStats, previous: Option<&TransportStats>) -> Self {
        let previous = previous.filter(|p| {
            current.packets_received >= p.packets_received
                && current.packets_lost >= p.packets_lost
                && current.bytes_received >= p.bytes_received
        });

        let (received, lost) = match previous {
            Some(p) => (
                current.packets_received - p.packets_received,
                current.packets_lost - p.packets_lost,
            ),
            None => (current.packets_received, current.packets_lost),
        };
        let expected = received + lost;
        let packet_loss_pct = if expected == 0 {
            0.0
        } else {
            lost as f64 * 100.0 / expected as f64
        };

        let bitrate_bps = match previous {
            Some(p) if current.timestamp_ms > p.timestamp_ms => {
                let bytes = (current.bytes_received - p.bytes_received) as f64;
                let secs = (current.timestamp_ms - p.timestamp_ms) as f64 / 1000.0;
                bytes * 8.0 / secs
            }
            _ => 0.0,
        };

        Self {
            round_trip_time_ms: current.round_trip_time_ms,
            packet_loss_pct,
            jitter_ms: current.jitter_ms.unwrap_or(0.0),
            bitrate_bps,
            timestamp: current.timestamp_ms,
        }
    }
}

/// Score of one peer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerQuality {
    pub peer_id: String,
    pub stats: ConnectionStats,
    pub mos: Option<f64>,
    pub bucket: QualityBucket,
}

/// Session-level view: every sampled peer plus the worst of them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    pub peers: Vec<PeerQuality>,
    pub overall: QualityBucket,
    pub mos: Option<f64>,
}

/// Result of one sampling tick.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityUpdate {
    pub report: QualityReport,
    /// Set only on the tick where quality first drops into `Poor`.
    pub entered_poor: bool,
}

pub struct QualityMonitor {
    config: QualityConfig,
    last: HashMap<String, TransportStats>,
    current: HashMap<String, PeerQuality>,
    warned: bool,
}

impl QualityMonitor {
    pub fn new(config: QualityConfig) -> Self {
        Self {
            config,
            last: HashMap::new(),
            current: HashMap::new(),
            warned: false,
        }
    }

    /// Score a single set of derived metrics.
    pub fn score(&self, stats: &ConnectionStats) -> (Option<f64>, QualityBucket) {
        match stats.round_trip_time_ms {
            Some(rtt) => {
                let mos = estimate_mos(rtt, stats.packet_loss_pct, stats.jitter_ms, &self.config.mos);
                (Some(mos), QualityBucket::from_mos(mos, &self.config.buckets))
            }
            None => (None, QualityBucket::Unknown),
        }
    }

    /// Replace the per-peer view with this tick's samples.
    pub fn ingest(&mut self, samples: Vec<(String, TransportStats)>) -> QualityUpdate {
        self.current.clear();
        for (peer_id, raw) in samples {
            let stats = ConnectionStats::from_counters(&raw, self.last.get(&peer_id));
            let (mos, bucket) = self.score(&stats);
            debug!(peer_id = %peer_id, ?mos, bucket = bucket.label(), "Quality sample");
            self.last.insert(peer_id.clone(), raw);
            self.current.insert(
                peer_id.clone(),
                PeerQuality {
                    peer_id,
                    stats,
                    mos,
                    bucket,
                },
            );
        }

        let report = self.report();
        let entered_poor = match report.overall {
            QualityBucket::Poor if !self.warned => {
                self.warned = true;
                info!(mos = ?report.mos, "Connection quality dropped to poor");
                true
            }
            QualityBucket::Excellent | QualityBucket::Good | QualityBucket::Fair => {
                self.warned = false;
                false
            }
            _ => false,
        };

        QualityUpdate {
            report,
            entered_poor,
        }
    }

    pub fn report(&self) -> QualityReport {
        let mut peers: Vec<PeerQuality> = self.current.values().cloned().collect();
        peers.sort_by(|a, b| a.peer_id.cmp(&b.peer_id));

        let worst = peers
            .iter()
            .filter(|p| p.bucket != QualityBucket::Unknown)
            .min_by(|a, b| {
                a.bucket.rank().cmp(&b.bucket.rank()).then(
                    a.mos
                        .unwrap_or(f64::MAX)
                        .total_cmp(&b.mos.unwrap_or(f64::MAX)),
                )
            });

        QualityReport {
            overall: worst.map(|p| p.bucket).unwrap_or_default(),
            mos: worst.and_then(|p| p.mos),
            peers,
        }
    }

    pub fn bucket_for(&self, peer_id: &str) -> QualityBucket {
        self.current
            .get(peer_id)
            .map(|p| p.bucket)
            .unwrap_or_default()
    }

    /// Drop everything known about a peer.
    pub fn forget(&mut self, peer_id: &str) {
        self.last.remove(peer_id);
        self.current.remove(peer_id);
    }

    /// Clear all state, including the poor-quality warning latch.
    pub fn reset(&mut self) {
        self.last.clear();
        self.current.clear();
        self.warned = false;
    }
}
