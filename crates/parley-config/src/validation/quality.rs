//! Validation for quality monitoring and ICE server settings.

use crate::schema::ParleyConfig;

use super::helpers::{validate_range, validate_range_f64};

/// Validate sampling interval, E-model constants, and bucket ordering.
pub(crate) fn validate_quality(errors: &mut Vec<String>, config: &ParleyConfig) {
    let quality = &config.quality;
    validate_range(
        errors,
        "quality.stats_interval_ms",
        quality.stats_interval_ms,
        250,
        60_000,
    );
    validate_range_f64(errors, "quality.mos.base_r", quality.mos.base_r, 0.0, 100.0);
    validate_range_f64(
        errors,
        "quality.mos.delay_knee_ms",
        quality.mos.delay_knee_ms,
        0.0,
        1_000.0,
    );

    for (name, value) in [
        ("quality.mos.delay_coefficient", quality.mos.delay_coefficient),
        (
            "quality.mos.delay_knee_coefficient",
            quality.mos.delay_knee_coefficient,
        ),
        ("quality.mos.loss_coefficient", quality.mos.loss_coefficient),
        ("quality.mos.loss_scale", quality.mos.loss_scale),
        ("quality.mos.jitter_coefficient", quality.mos.jitter_coefficient),
    ] {
        if value < 0.0 {
            errors.push(format!("{name} = {value} must not be negative"));
        }
    }

    let b = &quality.buckets;
    for (name, value) in [
        ("quality.buckets.excellent", b.excellent),
        ("quality.buckets.good", b.good),
        ("quality.buckets.fair", b.fair),
    ] {
        validate_range_f64(errors, name, value, 1.0, 5.0);
    }
    if !(b.excellent >= b.good && b.good >= b.fair) {
        errors.push("quality.buckets must satisfy excellent >= good >= fair".into());
    }
}

/// Validate ICE server entries.
pub(crate) fn validate_ice(errors: &mut Vec<String>, config: &ParleyConfig) {
    for (i, server) in config.ice.servers.iter().enumerate() {
        if server.urls.is_empty() {
            errors.push(format!("ice.servers[{i}].urls must not be empty"));
        }
        for url in &server.urls {
            let known = ["stun:", "stuns:", "turn:", "turns:"]
                .iter()
                .any(|scheme| url.starts_with(scheme));
            if !known {
                errors.push(format!("ice.servers[{i}] has unsupported url {url:?}"));
            }
        }
        if url_needs_credentials(&server.urls) && server.credential.is_none() {
            errors.push(format!("ice.servers[{i}] is a TURN server without a credential"));
        }
    }
}

fn url_needs_credentials(urls: &[String]) -> bool {
    urls.iter().any(|u| u.starts_with("turn:") || u.starts_with("turns:"))
}
