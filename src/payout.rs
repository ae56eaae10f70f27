use crate::config::EngineConfig;
use crate::history::HistoryPoint;
use crate::stats;

/// Dynamic payout threshold for a cohort, from every positive delta-out it has seen.
/// Too few samples fall back to the floor; otherwise the floor still caps the
/// percentile from below so a quiet cohort does not flag ordinary play.
pub fn threshold_for_cohort(delta_out_samples: &[f64], cfg: &EngineConfig) -> f64 {
    let positive: Vec<f64> = delta_out_samples
        .iter()
        .copied()
        .filter(|v| v.is_finite() && *v > 0.0)
        .collect();
    if positive.len() < cfg.min_threshold_samples {
        return cfg.payout_floor;
    }
    stats::percentile_rank(&positive, cfg.threshold_percentile)
        .map(|p| p.max(cfg.payout_floor))
        .unwrap_or(cfg.payout_floor)
}

pub fn is_payout_event(point: &HistoryPoint, threshold: f64) -> bool {
    point.delta_out >= threshold
}
