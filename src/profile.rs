use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::config::{EngineConfig, GapPooling};
use crate::error::FleetError;
use crate::history::HistoryPoint;
use crate::payout::{is_payout_event, threshold_for_cohort};
use crate::stats;
use crate::store::FleetStore;

/// Statistical fingerprint of one model cohort. Rebuilt from scratch each time,
/// never merged incrementally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelProfile {
    pub model_id: String,
    pub units: usize,
    pub threshold: f64,
    // Median accumulated delta-in between payout events.
    pub cycle_length: Option<f64>,
    pub payout_median: Option<f64>,
    pub payout_mean: Option<f64>,
    // P90 payout magnitude over the median one.
    pub volatility: Option<f64>,
    pub sample_points: usize,
    pub sample_payouts: usize,
    pub pooling: GapPooling,
}

/// Pure profile computation over the histories of one cohort. Unit order
/// does not matter: points are ordered by timestamp, then unit id.
pub fn profile_from_histories(
    model_id: &str,
    histories: &[(&str, &[HistoryPoint])],
    cfg: &EngineConfig,
) -> ModelProfile {
    let sample_points: usize = histories.iter().map(|(_, pts)| pts.len()).sum();
    let delta_outs: Vec<f64> = histories
        .iter()
        .flat_map(|(_, pts)| pts.iter().map(|p| p.delta_out))
        .collect();
    let threshold = threshold_for_cohort(&delta_outs, cfg);

    let (gaps, magnitudes) = match cfg.gap_pooling {
        GapPooling::Cohort => {
            let mut pooled: Vec<(&str, &HistoryPoint)> = histories
                .iter()
                .flat_map(|(unit, pts)| pts.iter().map(move |p| (*unit, p)))
                .collect();
            pooled.sort_by(|a, b| a.1.ts.cmp(&b.1.ts).then(a.0.cmp(b.0)));
            walk_gaps(pooled.into_iter().map(|(_, p)| p), threshold)
        }
        GapPooling::PerUnit => {
            let mut ordered: Vec<&(&str, &[HistoryPoint])> = histories.iter().collect();
            ordered.sort_by(|a, b| a.0.cmp(b.0));
            let mut gaps = Vec::new();
            let mut magnitudes = Vec::new();
            for (_, pts) in ordered {
                let (g, m) = walk_gaps(pts.iter(), threshold);
                gaps.extend(g);
                magnitudes.extend(m);
            }
            (gaps, magnitudes)
        }
    };

    let positive_gaps: Vec<f64> = gaps.iter().copied().filter(|g| *g > 0.0).collect();
    let cycle_length = stats::median(&positive_gaps);
    let payout_median = stats::median(&magnitudes);
    let payout_mean = stats::mean(&magnitudes);
    let volatility = match (
        stats::percentile_rank(&magnitudes, cfg.volatility_percentile),
        payout_median,
    ) {
        (Some(p90), Some(med)) if p90 != 0.0 && med != 0.0 => Some(p90 / med),
        _ => None,
    };

    ModelProfile {
        model_id: model_id.to_string(),
        units: histories.len(),
        threshold,
        cycle_length,
        payout_median,
        payout_mean,
        volatility,
        sample_points,
        sample_payouts: magnitudes.len(),
        pooling: cfg.gap_pooling,
    }
}

// Accumulates delta-in; every payout event closes a gap (its own delta-in included).
fn walk_gaps<'a>(
    points: impl Iterator<Item = &'a HistoryPoint>,
    threshold: f64,
) -> (Vec<f64>, Vec<f64>) {
    let mut gaps = Vec::new();
    let mut magnitudes = Vec::new();
    let mut since = 0.0;
    for p in points {
        since += p.delta_in;
        if is_payout_event(p, threshold) {
            gaps.push(since);
            magnitudes.push(p.delta_out);
            since = 0.0;
        }
    }
    (gaps, magnitudes)
}

/// Computes a cohort profile from the current store without installing it.
pub fn compute_profile(
    store: &FleetStore,
    model_id: &str,
    cfg: &EngineConfig,
) -> Option<ModelProfile> {
    let units = store.units_of_model(model_id);
    if units.is_empty() {
        return None;
    }
    let histories: Vec<(&str, &[HistoryPoint])> = units
        .into_iter()
        .map(|unit| (unit, store.history(unit)))
        .collect();
    Some(profile_from_histories(model_id, &histories, cfg))
}

/// Cached profile for read paths, or a transient one computed on the spot.
pub fn profile_for_query(
    store: &FleetStore,
    model_id: &str,
    cfg: &EngineConfig,
) -> Result<Arc<ModelProfile>, FleetError> {
    if let Some(profile) = store.profile(model_id) {
        return Ok(profile);
    }
    compute_profile(store, model_id, cfg)
        .map(Arc::new)
        .ok_or_else(|| FleetError::UnknownModel(model_id.to_string()))
}

pub fn build_profile(
    store: &mut FleetStore,
    model_id: &str,
    cfg: &EngineConfig,
) -> Result<Arc<ModelProfile>, FleetError> {
    let profile = compute_profile(store, model_id, cfg)
        .ok_or_else(|| FleetError::UnknownModel(model_id.to_string()))?;
    log_profile(&profile);
    Ok(store.install_profile(profile))
}

/// Rebuilds every model's profile. Profiles are computed in parallel from an
/// immutable view, then each one is swapped in whole. Returns the number built.
pub fn rebuild_all_profiles(store: &mut FleetStore, cfg: &EngineConfig) -> usize {
    let model_ids: Vec<String> = store.model_ids().into_iter().map(str::to_string).collect();
    let view: &FleetStore = store;
    let built: Vec<ModelProfile> = model_ids
        .par_iter()
        .filter_map(|model_id| compute_profile(view, model_id, cfg))
        .collect();

    store
        .profiles
        .retain(|model_id, _| model_ids.iter().any(|m| m == model_id));
    let count = built.len();
    for profile in built {
        log_profile(&profile);
        store.install_profile(profile);
    }
    count
}

fn log_profile(profile: &ModelProfile) {
    info!(
        model = %profile.model_id,
        units = profile.units,
        threshold = profile.threshold,
        cycle_length = ?profile.cycle_length,
        points = profile.sample_points,
        payouts = profile.sample_payouts,
        "model profile rebuilt"
    );
}
