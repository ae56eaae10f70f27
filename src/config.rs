use std::env;

use serde::{Deserialize, Serialize};

/// How payout gaps are assigned when building a model profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GapPooling {
    // All units of the model are merged into one time-ordered stream.
    Cohort,
    // Gaps are walked per unit and the results aggregated afterwards.
    PerUnit,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EngineConfig {
    pub payout_floor: f64,
    pub min_threshold_samples: usize,
    pub threshold_percentile: f64,
    pub volatility_percentile: f64,
    pub rate_window: usize,
    pub max_rate_gap_hours: f64,
    pub default_peer_limit: usize,
    pub insufficient_sentinel: f64,
    pub gap_pooling: GapPooling,
    pub rebaseline_on_rollback: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            payout_floor: 20.0,
            min_threshold_samples: 6,
            threshold_percentile: 0.85,
            volatility_percentile: 0.90,
            rate_window: 12,
            max_rate_gap_hours: 48.0,
            default_peer_limit: 8,
            insufficient_sentinel: 1e12,
            gap_pooling: GapPooling::Cohort,
            rebaseline_on_rollback: false,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            payout_floor: env_f64("FLEET_PAYOUT_FLOOR", d.payout_floor).max(0.0),
            min_threshold_samples: env_usize("FLEET_MIN_THRESHOLD_SAMPLES", d.min_threshold_samples)
                .max(1),
            threshold_percentile: env_f64("FLEET_THRESHOLD_PERCENTILE", d.threshold_percentile)
                .clamp(0.0, 1.0),
            volatility_percentile: env_f64("FLEET_VOLATILITY_PERCENTILE", d.volatility_percentile)
                .clamp(0.0, 1.0),
            rate_window: env_usize("FLEET_RATE_WINDOW", d.rate_window).max(2),
            max_rate_gap_hours: env_f64("FLEET_MAX_RATE_GAP_HOURS", d.max_rate_gap_hours),
            default_peer_limit: env_usize("FLEET_PEER_LIMIT", d.default_peer_limit).max(1),
            insufficient_sentinel: d.insufficient_sentinel,
            gap_pooling: env_pooling("FLEET_GAP_POOLING", d.gap_pooling),
            rebaseline_on_rollback: env_bool("FLEET_REBASELINE_ON_ROLLBACK", d.rebaseline_on_rollback),
        }
    }
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|val| val.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}

fn env_pooling(key: &str, default: GapPooling) -> GapPooling {
    match env::var(key).map(|v| v.trim().to_ascii_lowercase()) {
        Ok(v) if v == "cohort" => GapPooling::Cohort,
        Ok(v) if v == "per_unit" || v == "unit" => GapPooling::PerUnit,
        _ => default,
    }
}
