use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::nominal::NominalCycle;
use crate::snapshot::{MachineSnapshot, SnapshotBatch};

const LOCATIONS: &[&str] = &[
    "Bar Centrale",
    "Tabacchi Roma",
    "Sala Giochi Aurora",
    "Caffe Stazione",
    "Bar Sport",
    "Lounge Duomo",
];

#[derive(Debug, Clone, Copy)]
pub struct FakeFleetConfig {
    pub units: usize,
    pub models: usize,
    pub days: u32,
    pub reads_per_day: u32,
    pub seed: u64,
    // Probability that a row arrives without a usable read timestamp.
    pub untimed_rate: f64,
    // Probability of a meter reset on a given read.
    pub reset_rate: f64,
}

impl Default for FakeFleetConfig {
    fn default() -> Self {
        Self {
            units: 24,
            models: 3,
            days: 14,
            reads_per_day: 4,
            seed: 7,
            untimed_rate: 0.02,
            reset_rate: 0.002,
        }
    }
}

#[derive(Debug, Clone)]
struct FakeUnit {
    unit_id: String,
    model_idx: usize,
    location: String,
    rate_per_hour: f64,
    cumulative_in: f64,
    cumulative_out: f64,
    since_payout: f64,
    next_payout_at: f64,
    active: bool,
    no_link_days: u32,
}

#[derive(Debug, Clone)]
pub struct FakeFleet {
    pub batches: Vec<SnapshotBatch>,
    pub nominal: Vec<NominalCycle>,
}

pub fn model_id(idx: usize) -> String {
    format!("MOD{:03}", idx + 1)
}

/// Deterministic synthetic fleet: every unit plays at its own rate and pays
/// out roughly once per model cycle, with occasional untimed rows and resets.
pub fn generate(cfg: FakeFleetConfig) -> FakeFleet {
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let models = cfg.models.max(1);

    let nominal: Vec<NominalCycle> = (0..models)
        .map(|idx| NominalCycle {
            model_id: model_id(idx),
            model_name: format!("Model {}", idx + 1),
            cycle_in: Some(300.0 + 150.0 * idx as f64),
            payout_pct: Some(rng.gen_range(60.0..70.0)),
        })
        .collect();

    let mut units: Vec<FakeUnit> = (0..cfg.units)
        .map(|idx| {
            let model_idx = idx % models;
            let cycle = cycle_of(&nominal[model_idx]);
            FakeUnit {
                unit_id: format!("U{:05}", idx + 1),
                model_idx,
                location: LOCATIONS[idx % LOCATIONS.len()].to_string(),
                rate_per_hour: rng.gen_range(8.0..40.0),
                cumulative_in: rng.gen_range(1_000.0..50_000.0_f64).round(),
                cumulative_out: 0.0,
                since_payout: rng.gen_range(0.0..cycle),
                next_payout_at: cycle * rng.gen_range(0.8..1.2),
                active: rng.gen_bool(0.85),
                no_link_days: if rng.gen_bool(0.1) {
                    rng.gen_range(1..10)
                } else {
                    0
                },
            }
        })
        .collect();
    for unit in &mut units {
        unit.cumulative_out = (unit.cumulative_in * 0.6).round();
    }

    let start = start_time();
    let reads_per_day = cfg.reads_per_day.max(1);
    let step_minutes = (24 * 60 / reads_per_day) as i64;
    let step_hours = step_minutes as f64 / 60.0;
    let total_reads = cfg.days.max(1) * reads_per_day;

    let mut batches = Vec::with_capacity(total_reads as usize);
    for read in 0..total_reads {
        let taken_at = start + Duration::minutes(step_minutes * read as i64);
        let batch_id = format!("report-{}", taken_at.format("%Y-%m-%d-%H%M"));
        let mut snapshots = Vec::with_capacity(units.len());

        for unit in &mut units {
            let cycle = cycle_of(&nominal[unit.model_idx]);
            if read > 0 {
                advance(unit, cycle, step_hours, &mut rng);
            }
            if rng.gen_bool(cfg.reset_rate.clamp(0.0, 1.0)) {
                unit.cumulative_in = 0.0;
                unit.cumulative_out = 0.0;
            }

            let jitter = Duration::minutes(rng.gen_range(0..20));
            let observed_at = if rng.gen_bool(cfg.untimed_rate.clamp(0.0, 1.0)) {
                None
            } else {
                Some(taken_at + jitter)
            };
            let mut snapshot = MachineSnapshot::new(
                unit.unit_id.clone(),
                model_id(unit.model_idx),
                unit.cumulative_in,
                unit.cumulative_out,
                observed_at,
            );
            snapshot.model_name = nominal[unit.model_idx].model_name.clone();
            snapshot.location = unit.location.clone();
            snapshot.active = unit.active;
            snapshot.no_link_days = unit.no_link_days;
            snapshot.state = if unit.active { "E" } else { "M" }.to_string();
            snapshots.push(snapshot);
        }

        batches.push(SnapshotBatch {
            batch_id,
            snapshots,
        });
    }

    FakeFleet { batches, nominal }
}

fn advance(unit: &mut FakeUnit, cycle: f64, hours: f64, rng: &mut StdRng) {
    let played = (unit.rate_per_hour * hours * rng.gen_range(0.5..1.5)).round();
    unit.cumulative_in += played;
    unit.since_payout += played;
    // Small wins keep trickling out between payouts.
    unit.cumulative_out += (played * rng.gen_range(0.0..0.1)).round();

    if unit.since_payout >= unit.next_payout_at {
        unit.cumulative_out += (cycle * rng.gen_range(0.4..0.8)).round();
        unit.since_payout = 0.0;
        unit.next_payout_at = cycle * rng.gen_range(0.8..1.2);
    }
}

fn cycle_of(nominal: &NominalCycle) -> f64 {
    nominal.cycle_in.unwrap_or(400.0)
}

fn start_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 6)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .unwrap_or_default()
}
