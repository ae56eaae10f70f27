use chrono::{Duration, NaiveDate, NaiveDateTime};

use fleet_cycles::config::EngineConfig;
use fleet_cycles::error::FleetError;
use fleet_cycles::history::{HistoryPoint, record_snapshot};
use fleet_cycles::predict::{
    InsufficientReason, Prediction, play_rate, predict, progress_since_payout,
};
use fleet_cycles::profile::rebuild_all_profiles;
use fleet_cycles::snapshot::MachineSnapshot;
use fleet_cycles::store::FleetStore;

fn at(hours: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 1, 6)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .expect("valid base time")
        + Duration::hours(hours)
}

// Consecutive points, each measured from the one before it.
fn chain(reads: &[(i64, f64, f64)]) -> Vec<HistoryPoint> {
    let mut prev = reads.first().map(|r| r.0 - 1).unwrap_or_default();
    reads
        .iter()
        .map(|&(hours, delta_in, delta_out)| {
            let point = HistoryPoint {
                ts: at(hours),
                prev_ts: at(prev),
                delta_in,
                delta_out,
                payout_ratio_pct: None,
            };
            prev = hours;
            point
        })
        .collect()
}

fn record(store: &mut FleetStore, unit: &str, hours: i64, cin: f64, cout: f64) {
    let snapshot = MachineSnapshot::new(unit, "MOD-A", cin, cout, Some(at(hours)));
    record_snapshot(store, snapshot, &EngineConfig::default());
}

// U1 plays 100 + 100 (paying 60 on the second read), then 30 + 30.
fn one_payout_store() -> FleetStore {
    let mut store = FleetStore::new();
    record(&mut store, "U1", 0, 1_000.0, 500.0);
    record(&mut store, "U1", 1, 1_100.0, 500.0);
    record(&mut store, "U1", 2, 1_200.0, 560.0);
    record(&mut store, "U1", 3, 1_230.0, 560.0);
    record(&mut store, "U1", 4, 1_260.0, 560.0);
    store
}

#[test]
fn forecast_counts_progress_from_last_payout() {
    let cfg = EngineConfig::default();
    let mut store = one_payout_store();
    rebuild_all_profiles(&mut store, &cfg);

    let prediction = predict(&store, "U1", &cfg).expect("known unit");
    let forecast = prediction.forecast().expect("enough history");

    assert_eq!(forecast.cycle_length, 200.0);
    // 30 + 30 + the payout read's own 100.
    assert_eq!(forecast.progress, 160.0);
    assert_eq!(forecast.remaining, 40.0);
    let rate = forecast.rate_per_hour.expect("rate");
    assert!((rate - 160.0 / 3.0).abs() < 1e-9);
    let eta = forecast.eta_hours.expect("eta");
    assert!((eta - 0.75).abs() < 1e-9);
    assert_eq!(forecast.expected_payout_median, Some(60.0));
    assert_eq!(forecast.expected_payout_mean, Some(60.0));
}

#[test]
fn remaining_never_goes_negative() {
    let cfg = EngineConfig::default();
    let mut store = one_payout_store();
    record(&mut store, "U1", 5, 1_500.0, 560.0);

    let forecast = predict(&store, "U1", &cfg)
        .expect("known unit")
        .forecast()
        .cloned()
        .expect("enough history");
    assert_eq!(forecast.progress, 400.0);
    assert_eq!(forecast.remaining, 0.0);
    assert_eq!(forecast.eta_hours, Some(0.0));
}

#[test]
fn predict_builds_transient_profile_without_storing_it() {
    let cfg = EngineConfig::default();
    let store = one_payout_store();
    assert_eq!(store.profile_count(), 0);

    let prediction = predict(&store, "U1", &cfg).expect("known unit");
    assert!(prediction.is_ready());
    assert_eq!(store.profile_count(), 0);
}

#[test]
fn unit_without_history_is_insufficient() {
    let cfg = EngineConfig::default();
    let mut store = one_payout_store();
    record(&mut store, "U2", 0, 40.0, 10.0);

    assert_eq!(
        predict(&store, "U2", &cfg).expect("known unit"),
        Prediction::Insufficient {
            reason: InsufficientReason::NoHistory
        }
    );
}

#[test]
fn model_without_cycle_is_insufficient() {
    let cfg = EngineConfig::default();
    let mut store = FleetStore::new();
    record(&mut store, "U1", 0, 100.0, 50.0);
    record(&mut store, "U1", 1, 140.0, 52.0);

    let prediction = predict(&store, "U1", &cfg).expect("known unit");
    assert_eq!(
        prediction,
        Prediction::Insufficient {
            reason: InsufficientReason::NoCycleEstimate
        }
    );
    assert!(prediction.remaining().is_none());
}

#[test]
fn unknown_unit_is_a_contract_error() {
    let cfg = EngineConfig::default();
    let store = one_payout_store();
    assert_eq!(
        predict(&store, "GHOST", &cfg),
        Err(FleetError::UnknownUnit("GHOST".to_string()))
    );
}

#[test]
fn progress_without_payout_sums_everything() {
    let history = chain(&[(1, 10.0, 0.0), (2, 15.0, 5.0), (3, 20.0, 0.0)]);
    assert_eq!(progress_since_payout(&history, 20.0), 45.0);
    assert_eq!(progress_since_payout(&[], 20.0), 0.0);
}

#[test]
fn play_rate_skips_stale_and_idle_intervals() {
    let cfg = EngineConfig::default();
    let history = chain(&[
        (0, 10.0, 0.0),
        (2, 40.0, 0.0),
        // 72h gap: stale.
        (74, 500.0, 0.0),
        // Idle interval.
        (75, 0.0, 0.0),
        (77, 20.0, 0.0),
    ]);
    // (40 + 20) / (2 + 2)
    assert_eq!(play_rate(&history, &cfg), Some(15.0));
}

#[test]
fn play_rate_needs_a_usable_interval() {
    let cfg = EngineConfig::default();
    assert_eq!(play_rate(&chain(&[(0, 10.0, 0.0)]), &cfg), None);
    assert_eq!(
        play_rate(&chain(&[(0, 10.0, 0.0), (60, 10.0, 0.0)]), &cfg),
        None
    );
}

#[test]
fn play_rate_only_looks_at_recent_window() {
    let cfg = EngineConfig::default();
    // Early slow play (10/h) followed by 12 fast reads (100/h).
    let reads: Vec<(i64, f64, f64)> = (0..22)
        .map(|h| (h, if h < 10 { 10.0 } else { 100.0 }, 0.0))
        .collect();
    assert_eq!(play_rate(&chain(&reads), &cfg), Some(100.0));
}

#[test]
fn play_rate_measures_from_the_rebaselined_reading() {
    let cfg = EngineConfig {
        rebaseline_on_rollback: true,
        ..EngineConfig::default()
    };
    let mut store = FleetStore::new();
    for (hours, cin) in [(0, 0.0), (1, 10.0), (40, 0.0), (41, 10.0)] {
        let snapshot = MachineSnapshot::new("U1", "MOD-A", cin, 0.0, Some(at(hours)));
        record_snapshot(&mut store, snapshot, &cfg);
    }

    let history = store.history("U1");
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].prev_ts, at(40));
    // 10 played in the hour after the reset, not over the 40h since the last point.
    assert_eq!(play_rate(history, &cfg), Some(10.0));
}
