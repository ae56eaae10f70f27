use fleet_cycles::config::EngineConfig;
use fleet_cycles::fake_fleet::{FakeFleetConfig, generate, model_id};
use fleet_cycles::history::ingest_batch;
use fleet_cycles::peers::peers;
use fleet_cycles::predict::predict;
use fleet_cycles::store::FleetStore;

fn small() -> FakeFleetConfig {
    FakeFleetConfig {
        units: 9,
        models: 3,
        days: 10,
        ..FakeFleetConfig::default()
    }
}

fn ingest_all(cfg: FakeFleetConfig) -> FleetStore {
    let engine = EngineConfig::default();
    let fleet = generate(cfg);
    let mut store = FleetStore::new();
    store.set_nominal_cycles(fleet.nominal);
    for batch in fleet.batches {
        ingest_batch(&mut store, batch, &engine);
    }
    store
}

#[test]
fn same_seed_same_fleet() {
    let a = generate(small());
    let b = generate(small());
    assert_eq!(a.batches.len(), 40);
    assert_eq!(a.nominal, b.nominal);
    for (x, y) in a.batches.iter().zip(&b.batches) {
        assert_eq!(x.batch_id, y.batch_id);
        assert_eq!(x.snapshots, y.snapshots);
    }

    let c = generate(FakeFleetConfig { seed: 99, ..small() });
    assert_ne!(a.batches[5].snapshots, c.batches[5].snapshots);
}

#[test]
fn replayed_fleet_is_fully_profiled() {
    let engine = EngineConfig::default();
    let store = ingest_all(small());

    assert_eq!(store.unit_ids().len(), 9);
    assert_eq!(store.profile_count(), 3);
    for idx in 0..3 {
        let profile = store.profile(&model_id(idx)).expect("profile per model");
        assert_eq!(profile.units, 3);
        assert!(profile.sample_points > 0);
    }

    for unit_id in store.unit_ids() {
        let history = store.history(unit_id);
        assert!(history.windows(2).all(|w| w[0].ts < w[1].ts));
        assert!(history.iter().all(|p| p.delta_in >= 0.0 && p.delta_out >= 0.0));
        assert!(predict(&store, unit_id, &engine).is_ok());
    }
}

#[test]
fn peers_stay_within_model() {
    let engine = EngineConfig::default();
    let store = ingest_all(small());
    let rows = peers(&store, "U00001", 8, &engine).expect("valid query");

    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(store.model_of(&row.unit_id), Some("MOD001"));
    }
}
