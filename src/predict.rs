use std::fmt;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::FleetError;
use crate::history::HistoryPoint;
use crate::payout::is_payout_event;
use crate::profile::{ModelProfile, profile_for_query};
use crate::store::FleetStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InsufficientReason {
    NoHistory,
    NoCycleEstimate,
}

impl fmt::Display for InsufficientReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsufficientReason::NoHistory => {
                f.write_str("not enough history to estimate cycle/prediction")
            }
            InsufficientReason::NoCycleEstimate => {
                f.write_str("not enough history to estimate cycle for this model")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    // Delta-in accumulated since the unit's last payout event.
    pub progress: f64,
    pub remaining: f64,
    pub cycle_length: f64,
    pub rate_per_hour: Option<f64>,
    pub eta_hours: Option<f64>,
    pub expected_payout_median: Option<f64>,
    pub expected_payout_mean: Option<f64>,
}

/// Derived per query and never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Prediction {
    Insufficient { reason: InsufficientReason },
    Ready(Forecast),
}

impl Prediction {
    pub fn forecast(&self) -> Option<&Forecast> {
        match self {
            Prediction::Ready(f) => Some(f),
            Prediction::Insufficient { .. } => None,
        }
    }

    pub fn remaining(&self) -> Option<f64> {
        self.forecast().map(|f| f.remaining)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Prediction::Ready(_))
    }
}

/// Predicts the next payout for one unit. Uses the cached model profile, or a
/// transient one when the model has not been built yet; the store is not touched.
pub fn predict(
    store: &FleetStore,
    unit_id: &str,
    cfg: &EngineConfig,
) -> Result<Prediction, FleetError> {
    let model_id = store
        .model_of(unit_id)
        .ok_or_else(|| FleetError::UnknownUnit(unit_id.to_string()))?;
    let profile = profile_for_query(store, model_id, cfg)?;
    Ok(predict_with_profile(store.history(unit_id), &profile, cfg))
}

pub fn predict_with_profile(
    history: &[HistoryPoint],
    profile: &ModelProfile,
    cfg: &EngineConfig,
) -> Prediction {
    if history.is_empty() {
        return Prediction::Insufficient {
            reason: InsufficientReason::NoHistory,
        };
    }
    let Some(cycle_length) = profile.cycle_length else {
        return Prediction::Insufficient {
            reason: InsufficientReason::NoCycleEstimate,
        };
    };

    let progress = progress_since_payout(history, profile.threshold);
    let remaining = (cycle_length - progress).max(0.0);
    let rate_per_hour = play_rate(history, cfg);

    Prediction::Ready(Forecast {
        progress,
        remaining,
        cycle_length,
        rate_per_hour,
        eta_hours: eta_hours(remaining, rate_per_hour),
        expected_payout_median: profile.payout_median,
        expected_payout_mean: profile.payout_mean,
    })
}

/// Walks back from the newest point, summing delta-in up to and including the
/// most recent payout event (or the whole sequence when there is none).
pub fn progress_since_payout(history: &[HistoryPoint], threshold: f64) -> f64 {
    let mut progress = 0.0;
    for p in history.iter().rev() {
        progress += p.delta_in;
        if is_payout_event(p, threshold) {
            break;
        }
    }
    progress
}

/// Currency per hour over the last `rate_window` points. Every point after the
/// first in the window contributes its own delta-in over its own interval
/// (`prev_ts..ts`); intervals that are non-positive, longer than
/// `max_rate_gap_hours`, or carry no input are skipped.
pub fn play_rate(history: &[HistoryPoint], cfg: &EngineConfig) -> Option<f64> {
    let start = history.len().saturating_sub(cfg.rate_window);
    let tail = &history[start..];

    let mut total_in = 0.0;
    let mut total_hours = 0.0;
    for p in tail.iter().skip(1) {
        let hours = (p.ts - p.prev_ts).num_seconds() as f64 / 3600.0;
        if hours <= 0.0 || hours > cfg.max_rate_gap_hours {
            continue;
        }
        if p.delta_in <= 0.0 {
            continue;
        }
        total_in += p.delta_in;
        total_hours += hours;
    }
    if total_hours <= 0.0 {
        return None;
    }
    Some(total_in / total_hours)
}

pub fn eta_hours(remaining: f64, rate_per_hour: Option<f64>) -> Option<f64> {
    match rate_per_hour {
        Some(rate) if rate > 0.0 => Some(remaining / rate),
        _ => None,
    }
}
