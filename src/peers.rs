use std::cmp::Ordering;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::FleetError;
use crate::predict::{Forecast, Prediction, predict_with_profile};
use crate::profile::profile_for_query;
use crate::store::FleetStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeerEntry {
    pub unit_id: String,
    pub location: String,
    pub prediction: Prediction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LikelyEntry {
    pub unit_id: String,
    pub model_id: String,
    pub location: String,
    pub score: f64,
    pub forecast: Forecast,
}

/// Other units of the same model, closest to their next payout first.
/// Units without a usable prediction go last.
pub fn peers(
    store: &FleetStore,
    unit_id: &str,
    limit: usize,
    cfg: &EngineConfig,
) -> Result<Vec<PeerEntry>, FleetError> {
    if limit == 0 {
        return Err(FleetError::InvalidLimit(limit));
    }
    let model_id = store
        .model_of(unit_id)
        .ok_or_else(|| FleetError::UnknownUnit(unit_id.to_string()))?;
    let profile = profile_for_query(store, model_id, cfg)?;

    let mut out: Vec<PeerEntry> = store
        .units_of_model(model_id)
        .into_iter()
        .filter(|other| *other != unit_id)
        .map(|other| PeerEntry {
            unit_id: other.to_string(),
            location: store
                .snapshot(other)
                .map(|s| s.location.clone())
                .unwrap_or_default(),
            prediction: predict_with_profile(store.history(other), &profile, cfg),
        })
        .collect();

    let sort_key = |p: &Prediction| p.remaining().unwrap_or(cfg.insufficient_sentinel);
    out.sort_by(|a, b| {
        sort_key(&a.prediction)
            .partial_cmp(&sort_key(&b.prediction))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.unit_id.cmp(&b.unit_id))
    });
    out.truncate(limit);
    Ok(out)
}

/// Fleet-wide shortlist: low remaining input, an active cabinet and a recent
/// link all push a unit up.
pub fn most_likely_next(
    store: &FleetStore,
    limit: usize,
    cfg: &EngineConfig,
) -> Result<Vec<LikelyEntry>, FleetError> {
    if limit == 0 {
        return Err(FleetError::InvalidLimit(limit));
    }

    let mut out = Vec::new();
    for model_id in store.model_ids() {
        let profile = profile_for_query(store, model_id, cfg)?;
        for unit_id in store.units_of_model(model_id) {
            let Some(snapshot) = store.snapshot(unit_id) else {
                continue;
            };
            let Prediction::Ready(forecast) =
                predict_with_profile(store.history(unit_id), &profile, cfg)
            else {
                continue;
            };
            let score = likelihood_score(forecast.remaining, snapshot.active, snapshot.no_link_days);
            out.push(LikelyEntry {
                unit_id: unit_id.to_string(),
                model_id: model_id.to_string(),
                location: snapshot.location.clone(),
                score,
                forecast,
            });
        }
    }

    out.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.unit_id.cmp(&b.unit_id))
    });
    out.truncate(limit);
    Ok(out)
}

pub fn likelihood_score(remaining: f64, active: bool, no_link_days: u32) -> f64 {
    let closeness = (400.0 - remaining).max(0.0);
    let activity = if active { 80.0 } else { -40.0 };
    let link = (40.0 - no_link_days as f64 * 6.0).max(-120.0);
    closeness + activity + link
}
