use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::nominal::NominalCycle;

/// One observation of one unit, as delivered by the ingestion collaborator.
/// Counters are currency units (`SnapshotRow` converts raw meter cents).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub unit_id: String,
    pub model_id: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub location: String,
    pub cumulative_in: f64,
    pub cumulative_out: f64,
    #[serde(default)]
    pub observed_at: Option<NaiveDateTime>,
    // Payout percentage as printed by the meter report, when the source carries one.
    #[serde(default)]
    pub reported_payout_pct: Option<f64>,
    #[serde(default)]
    pub no_link_days: u32,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub warning: String,
    // Cabinet enabled for play. Unknown means not active.
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub source_batch: Option<String>,
}

impl MachineSnapshot {
    pub fn new(
        unit_id: impl Into<String>,
        model_id: impl Into<String>,
        cumulative_in: f64,
        cumulative_out: f64,
        observed_at: Option<NaiveDateTime>,
    ) -> Self {
        Self {
            unit_id: unit_id.into(),
            model_id: model_id.into(),
            model_name: String::new(),
            location: String::new(),
            cumulative_in,
            cumulative_out,
            observed_at,
            reported_payout_pct: None,
            no_link_days: 0,
            state: String::new(),
            warning: String::new(),
            active: false,
            source_batch: None,
        }
    }

    pub fn has_valid_counters(&self) -> bool {
        self.cumulative_in.is_finite() && self.cumulative_out.is_finite()
    }
}

/// A group of snapshots that arrived together (one report file upstream).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotBatch {
    pub batch_id: String,
    pub snapshots: Vec<MachineSnapshot>,
}

pub fn cents_to_currency(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Normalized report row as the upstream reader emits it. The timestamp stays
/// raw; counters come in currency or as raw meter cents (cents win).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotRow {
    pub unit_id: String,
    pub model_id: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub cumulative_in: Option<f64>,
    #[serde(default)]
    pub cumulative_out: Option<f64>,
    #[serde(default)]
    pub meter_in_cents: Option<i64>,
    #[serde(default)]
    pub meter_out_cents: Option<i64>,
    #[serde(default)]
    pub observed_at: Option<String>,
    #[serde(default)]
    pub reported_payout_pct: Option<f64>,
    #[serde(default)]
    pub no_link_days: u32,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub warning: String,
    #[serde(default)]
    pub active: Option<bool>,
}

impl SnapshotRow {
    /// Missing counters become NaN so the history builder drops the row as
    /// `BadCounters`. Without an explicit flag, a state containing `E` means active.
    pub fn into_snapshot(self, batch_id: &str) -> MachineSnapshot {
        let observed_at = self.observed_at.as_deref().and_then(parse_observed_at);
        let cumulative_in = self
            .meter_in_cents
            .map(cents_to_currency)
            .or(self.cumulative_in)
            .unwrap_or(f64::NAN);
        let cumulative_out = self
            .meter_out_cents
            .map(cents_to_currency)
            .or(self.cumulative_out)
            .unwrap_or(f64::NAN);
        let active = self
            .active
            .unwrap_or_else(|| self.state.to_ascii_uppercase().contains('E'));

        let mut snapshot = MachineSnapshot::new(
            self.unit_id,
            self.model_id,
            cumulative_in,
            cumulative_out,
            observed_at,
        );
        snapshot.model_name = self.model_name;
        snapshot.location = self.location;
        snapshot.reported_payout_pct = self.reported_payout_pct;
        snapshot.no_link_days = self.no_link_days;
        snapshot.state = self.state;
        snapshot.warning = self.warning;
        snapshot.active = active;
        snapshot.source_batch = Some(batch_id.to_string());
        snapshot
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RowBatch {
    pub batch_id: String,
    pub rows: Vec<SnapshotRow>,
}

impl RowBatch {
    pub fn into_batch(self) -> SnapshotBatch {
        let snapshots = self
            .rows
            .into_iter()
            .map(|row| row.into_snapshot(&self.batch_id))
            .collect();
        SnapshotBatch {
            batch_id: self.batch_id,
            snapshots,
        }
    }
}

/// A replayable feed: the nominal cycle table plus report batches in arrival order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotFeed {
    #[serde(default)]
    pub nominal: Vec<NominalCycle>,
    pub batches: Vec<RowBatch>,
}

/// Parses the timestamp shapes seen in meter reports. Returns `None` for
/// anything unrecognised, which callers treat as "no timestamp". Input that
/// carries an offset is normalised to UTC so readings taken across a DST
/// change still order by instant; zone-less shapes are taken as written.
pub fn parse_observed_at(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    for fmt in [
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
        "%d-%m-%Y %H:%M:%S",
        "%d-%m-%Y %H:%M",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }
    for fmt in ["%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}
