use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use fleet_cycles::config::EngineConfig;
use fleet_cycles::fake_fleet::{FakeFleet, FakeFleetConfig, generate};
use fleet_cycles::history::{ingest_batch, record_snapshot};
use fleet_cycles::peers::{most_likely_next, peers};
use fleet_cycles::predict::predict;
use fleet_cycles::profile::rebuild_all_profiles;
use fleet_cycles::store::FleetStore;

fn bench_fleet() -> FakeFleet {
    generate(FakeFleetConfig {
        units: 200,
        models: 8,
        days: 30,
        ..FakeFleetConfig::default()
    })
}

fn loaded_store(fleet: &FakeFleet, cfg: &EngineConfig) -> FleetStore {
    let mut store = FleetStore::new();
    store.set_nominal_cycles(fleet.nominal.clone());
    for batch in &fleet.batches {
        for snapshot in &batch.snapshots {
            record_snapshot(&mut store, snapshot.clone(), cfg);
        }
    }
    rebuild_all_profiles(&mut store, cfg);
    store
}

fn bench_ingest(c: &mut Criterion) {
    let cfg = EngineConfig::default();
    let fleet = bench_fleet();
    c.bench_function("ingest_batches", |b| {
        b.iter(|| {
            let mut store = FleetStore::new();
            for batch in fleet.batches.iter().cloned() {
                ingest_batch(&mut store, batch, &cfg);
            }
            black_box(store.history_point_count());
        })
    });
}

fn bench_rebuild_profiles(c: &mut Criterion) {
    let cfg = EngineConfig::default();
    let fleet = bench_fleet();
    let mut store = loaded_store(&fleet, &cfg);
    c.bench_function("rebuild_all_profiles", |b| {
        b.iter(|| black_box(rebuild_all_profiles(&mut store, &cfg)))
    });
}

fn bench_predict(c: &mut Criterion) {
    let cfg = EngineConfig::default();
    let fleet = bench_fleet();
    let store = loaded_store(&fleet, &cfg);
    let units: Vec<String> = store.unit_ids().into_iter().map(str::to_string).collect();
    c.bench_function("predict_all_units", |b| {
        b.iter(|| {
            for unit_id in &units {
                black_box(predict(&store, unit_id, &cfg).unwrap());
            }
        })
    });
}

fn bench_rankings(c: &mut Criterion) {
    let cfg = EngineConfig::default();
    let fleet = bench_fleet();
    let store = loaded_store(&fleet, &cfg);
    c.bench_function("peers", |b| {
        b.iter(|| black_box(peers(&store, black_box("U00001"), 8, &cfg).unwrap().len()))
    });
    c.bench_function("most_likely_next", |b| {
        b.iter(|| black_box(most_likely_next(&store, 20, &cfg).unwrap().len()))
    });
}

criterion_group!(
    perf,
    bench_ingest,
    bench_rebuild_profiles,
    bench_predict,
    bench_rankings
);
criterion_main!(perf);
