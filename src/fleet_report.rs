use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::activity::{ActivityScore, Heat, Recency, activity_score, heat_label, recency_status};
use crate::config::EngineConfig;
use crate::error::FleetError;
use crate::nominal::{CyclePhase, cycle_phase};
use crate::predict::{Prediction, predict};
use crate::profile::ModelProfile;
use crate::store::FleetStore;

const NO_LINK_ALERT_DAYS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FleetStatus {
    pub units: usize,
    pub models: usize,
    pub history_points: usize,
    pub batches: usize,
    pub profiles: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum AnomalyKind {
    Warning(String),
    NoLink { days: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Anomaly {
    pub unit_id: String,
    pub location: String,
    pub kind: AnomalyKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRow {
    pub model_id: String,
    pub units: usize,
    pub profile: Option<Arc<ModelProfile>>,
}

/// Everything a detail view needs for one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitCard {
    pub unit_id: String,
    pub model_id: String,
    pub model_name: String,
    pub location: String,
    pub observed_at: Option<NaiveDateTime>,
    pub no_link_days: u32,
    pub recency: Recency,
    pub activity: ActivityScore,
    pub heat: Heat,
    pub nominal_phase: Option<CyclePhase>,
    pub prediction: Prediction,
}

pub fn fleet_status(store: &FleetStore) -> FleetStatus {
    FleetStatus {
        units: store.unit_ids().len(),
        models: store.model_ids().len(),
        history_points: store.history_point_count(),
        batches: store.batches().len(),
        profiles: store.profile_count(),
    }
}

/// Units reporting a meter warning or a long run without a link.
pub fn anomalies(store: &FleetStore) -> Vec<Anomaly> {
    let mut out = Vec::new();
    for unit_id in store.unit_ids() {
        let Some(s) = store.snapshot(unit_id) else {
            continue;
        };
        let warning = s.warning.trim();
        if !warning.is_empty() && warning != "null" && warning != "-" {
            out.push(Anomaly {
                unit_id: s.unit_id.clone(),
                location: s.location.clone(),
                kind: AnomalyKind::Warning(warning.to_string()),
            });
        }
        if s.no_link_days >= NO_LINK_ALERT_DAYS {
            out.push(Anomaly {
                unit_id: s.unit_id.clone(),
                location: s.location.clone(),
                kind: AnomalyKind::NoLink {
                    days: s.no_link_days,
                },
            });
        }
    }
    out
}

pub fn model_fingerprints(store: &FleetStore) -> Vec<ModelRow> {
    store
        .model_ids()
        .into_iter()
        .map(|model_id| ModelRow {
            model_id: model_id.to_string(),
            units: store.units_of_model(model_id).len(),
            profile: store.profile(model_id),
        })
        .collect()
}

pub fn unit_card(
    store: &FleetStore,
    unit_id: &str,
    now: NaiveDateTime,
    cfg: &EngineConfig,
) -> Result<UnitCard, FleetError> {
    let snapshot = store
        .snapshot(unit_id)
        .ok_or_else(|| FleetError::UnknownUnit(unit_id.to_string()))?;
    let prediction = predict(store, unit_id, cfg)?;
    let activity = activity_score(store.history(unit_id));
    let heat = heat_label(activity.score);
    let nominal_phase = store
        .nominal_cycle(&snapshot.model_id)
        .and_then(|n| cycle_phase(snapshot.cumulative_in, n));

    Ok(UnitCard {
        unit_id: snapshot.unit_id.clone(),
        model_id: snapshot.model_id.clone(),
        model_name: snapshot.model_name.clone(),
        location: snapshot.location.clone(),
        observed_at: snapshot.observed_at,
        no_link_days: snapshot.no_link_days,
        recency: recency_status(snapshot.observed_at, now),
        activity,
        heat,
        nominal_phase,
        prediction,
    })
}
