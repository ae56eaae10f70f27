use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::profile;
use crate::snapshot::{MachineSnapshot, SnapshotBatch};
use crate::store::FleetStore;

/// Counter movement between two consecutive timestamped snapshots of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub ts: NaiveDateTime,
    // Timestamp of the observation the deltas were measured against.
    pub prev_ts: NaiveDateTime,
    pub delta_in: f64,
    pub delta_out: f64,
    pub payout_ratio_pct: Option<f64>,
}

/// Last timestamped observation of a unit; deltas are measured against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeltaAnchor {
    pub ts: NaiveDateTime,
    pub cumulative_in: f64,
    pub cumulative_out: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Appended,
    // First timestamped observation of the unit: nothing to diff against yet.
    Baseline,
    Untimed,
    BadCounters,
    OutOfOrder,
    Rollback,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub batch_id: String,
    pub rows: usize,
    pub appended: usize,
    pub baselines: usize,
    pub untimed: usize,
    pub bad_counters: usize,
    pub out_of_order: usize,
    pub rollbacks: usize,
    pub profiles_rebuilt: usize,
}

impl IngestSummary {
    fn count(&mut self, outcome: RecordOutcome) {
        self.rows += 1;
        match outcome {
            RecordOutcome::Appended => self.appended += 1,
            RecordOutcome::Baseline => self.baselines += 1,
            RecordOutcome::Untimed => self.untimed += 1,
            RecordOutcome::BadCounters => self.bad_counters += 1,
            RecordOutcome::OutOfOrder => self.out_of_order += 1,
            RecordOutcome::Rollback => self.rollbacks += 1,
        }
    }

    pub fn dropped(&self) -> usize {
        self.untimed + self.bad_counters + self.out_of_order + self.rollbacks
    }

    /// Timestamped rows arrived but none became a history point. A batch of
    /// first sightings only (baselines) is expected to yield nothing.
    pub fn produced_no_history(&self) -> bool {
        let timed = self.rows - self.untimed;
        timed > self.baselines && self.appended == 0
    }
}

/// Accepts one observation. The latest-state map is always updated; a history
/// point is appended only for a strictly later timestamp with non-negative deltas.
pub fn record_snapshot(
    store: &mut FleetStore,
    snapshot: MachineSnapshot,
    cfg: &EngineConfig,
) -> RecordOutcome {
    let outcome = derive_point(store, &snapshot, cfg);
    if outcome != RecordOutcome::Appended && outcome != RecordOutcome::Baseline {
        debug!(unit = %snapshot.unit_id, ?outcome, "snapshot produced no history point");
    }
    store.latest.insert(snapshot.unit_id.clone(), snapshot);
    outcome
}

fn derive_point(
    store: &mut FleetStore,
    snapshot: &MachineSnapshot,
    cfg: &EngineConfig,
) -> RecordOutcome {
    let Some(ts) = snapshot.observed_at else {
        return RecordOutcome::Untimed;
    };
    if !snapshot.has_valid_counters() {
        return RecordOutcome::BadCounters;
    }

    let next = DeltaAnchor {
        ts,
        cumulative_in: snapshot.cumulative_in,
        cumulative_out: snapshot.cumulative_out,
    };
    let Some(prev) = store.anchors.get(&snapshot.unit_id).copied() else {
        store.anchors.insert(snapshot.unit_id.clone(), next);
        return RecordOutcome::Baseline;
    };
    if ts <= prev.ts {
        return RecordOutcome::OutOfOrder;
    }

    let delta_in = next.cumulative_in - prev.cumulative_in;
    let delta_out = next.cumulative_out - prev.cumulative_out;
    if delta_in < 0.0 || delta_out < 0.0 {
        if cfg.rebaseline_on_rollback {
            store.anchors.insert(snapshot.unit_id.clone(), next);
        }
        return RecordOutcome::Rollback;
    }

    let payout_ratio_pct = snapshot
        .reported_payout_pct
        .filter(|p| p.is_finite())
        .or_else(|| (delta_in > 0.0).then(|| delta_out / delta_in * 100.0));

    store
        .history
        .entry(snapshot.unit_id.clone())
        .or_default()
        .push(HistoryPoint {
            ts,
            prev_ts: prev.ts,
            delta_in,
            delta_out,
            payout_ratio_pct,
        });
    store.anchors.insert(snapshot.unit_id.clone(), next);
    RecordOutcome::Appended
}

/// Records a whole batch in arrival order, then rebuilds every model profile once.
pub fn ingest_batch(
    store: &mut FleetStore,
    batch: SnapshotBatch,
    cfg: &EngineConfig,
) -> IngestSummary {
    let mut summary = IngestSummary {
        batch_id: batch.batch_id.clone(),
        ..IngestSummary::default()
    };

    for mut snapshot in batch.snapshots {
        if snapshot.source_batch.is_none() {
            snapshot.source_batch = Some(batch.batch_id.clone());
        }
        let outcome = record_snapshot(store, snapshot, cfg);
        summary.count(outcome);
    }
    store.batches.push(batch.batch_id);

    summary.profiles_rebuilt = profile::rebuild_all_profiles(store, cfg);

    if summary.produced_no_history() {
        warn!(
            batch = %summary.batch_id,
            timed = summary.rows - summary.untimed,
            dropped = summary.dropped(),
            "batch had timestamped rows but produced no history"
        );
    }
    info!(
        batch = %summary.batch_id,
        rows = summary.rows,
        appended = summary.appended,
        dropped = summary.dropped(),
        profiles = summary.profiles_rebuilt,
        "batch ingested"
    );
    summary
}
