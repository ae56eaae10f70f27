use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use fleet_cycles::config::EngineConfig;
use fleet_cycles::history::ingest_batch;
use fleet_cycles::predict::{Prediction, predict};
use fleet_cycles::snapshot::SnapshotFeed;
use fleet_cycles::store::FleetStore;
use fleet_cycles::telemetry;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    telemetry::init_tracing("fleet_cycles=info");

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/replay_small.json"));

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read replay file {}", path.display()))?;
    let replay: SnapshotFeed = serde_json::from_str(&raw).context("parse replay file")?;

    let cfg = EngineConfig::from_env();
    let mut store = FleetStore::new();
    store.set_nominal_cycles(replay.nominal);

    for batch in replay.batches {
        let summary = ingest_batch(&mut store, batch.into_batch(), &cfg);
        println!(
            "{}: rows {} appended {} dropped {}",
            summary.batch_id,
            summary.rows,
            summary.appended,
            summary.dropped()
        );
    }

    println!();
    for unit_id in store.unit_ids() {
        match predict(&store, unit_id, &cfg)? {
            Prediction::Insufficient { reason } => println!("{unit_id}: {reason}"),
            Prediction::Ready(f) => println!(
                "{unit_id}: remaining {:.0} ETA {}",
                f.remaining,
                f.eta_hours
                    .map(|h| format!("{h:.1}h"))
                    .unwrap_or_else(|| "n/a".to_string())
            ),
        }
    }
    Ok(())
}
