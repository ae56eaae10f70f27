use anyhow::{Context, Result, anyhow};
use serde::Serialize;

use fleet_cycles::config::{EngineConfig, GapPooling};
use fleet_cycles::fake_fleet::{self, FakeFleetConfig};
use fleet_cycles::fleet_report::{
    FleetStatus, ModelRow, UnitCard, fleet_status, model_fingerprints, unit_card,
};
use fleet_cycles::history::ingest_batch;
use fleet_cycles::peers::{LikelyEntry, PeerEntry, most_likely_next, peers};
use fleet_cycles::predict::Prediction;
use fleet_cycles::store::FleetStore;
use fleet_cycles::telemetry;

#[derive(Debug, Serialize)]
struct DemoReport {
    status: FleetStatus,
    models: Vec<ModelRow>,
    likely: Vec<LikelyEntry>,
    unit: Option<UnitCard>,
    peers: Vec<PeerEntry>,
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    telemetry::init_tracing("fleet_cycles=info");

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = EngineConfig::from_env();
    if let Some(raw) = arg_value(&args, "--pooling") {
        cfg.gap_pooling = match raw.as_str() {
            "cohort" => GapPooling::Cohort,
            "per_unit" | "unit" => GapPooling::PerUnit,
            other => return Err(anyhow!("unknown pooling mode: {other}")),
        };
    }

    let defaults = FakeFleetConfig::default();
    let fleet_cfg = FakeFleetConfig {
        units: parse_arg(&args, "--units")?.unwrap_or(defaults.units),
        models: parse_arg(&args, "--models")?.unwrap_or(defaults.models),
        days: parse_arg(&args, "--days")?.unwrap_or(defaults.days),
        seed: parse_arg(&args, "--seed")?.unwrap_or(defaults.seed),
        ..defaults
    };
    let top: usize = parse_arg(&args, "--top")?.unwrap_or(10);
    let as_json = args.iter().any(|a| a == "--json");

    let fleet = fake_fleet::generate(fleet_cfg);
    let mut store = FleetStore::new();
    store.set_nominal_cycles(fleet.nominal);
    for batch in fleet.batches {
        ingest_batch(&mut store, batch, &cfg);
    }

    let now = store
        .snapshots()
        .filter_map(|s| s.observed_at)
        .max()
        .context("synthetic fleet produced no timestamps")?;

    let unit_id = arg_value(&args, "--unit").or_else(|| {
        most_likely_next(&store, 1, &cfg)
            .ok()
            .and_then(|rows| rows.into_iter().next())
            .map(|row| row.unit_id)
    });
    let unit = match unit_id.as_deref() {
        Some(id) => Some(unit_card(&store, id, now, &cfg)?),
        None => None,
    };
    let peer_rows = match unit_id.as_deref() {
        Some(id) => peers(&store, id, cfg.default_peer_limit, &cfg)?,
        None => Vec::new(),
    };

    let report = DemoReport {
        status: fleet_status(&store),
        models: model_fingerprints(&store),
        likely: most_likely_next(&store, top.max(1), &cfg)?,
        unit,
        peers: peer_rows,
    };

    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("serialize report")?
        );
        return Ok(());
    }
    print_report(&report);
    Ok(())
}

fn print_report(report: &DemoReport) {
    let s = &report.status;
    println!(
        "Fleet: {} units, {} models, {} history points, {} reports",
        s.units, s.models, s.history_points, s.batches
    );
    println!();
    println!("Models:");
    for row in &report.models {
        let Some(p) = row.profile.as_ref() else {
            println!("  {} ({} units): no profile", row.model_id, row.units);
            continue;
        };
        println!(
            "  {} ({} units): threshold {:.0}, cycle {}, payout med {} avg {}, volatility {}, payouts {}",
            row.model_id,
            row.units,
            p.threshold,
            fmt_money(p.cycle_length),
            fmt_money(p.payout_median),
            fmt_money(p.payout_mean),
            p.volatility
                .map(|v| format!("{v:.2}"))
                .unwrap_or_else(|| "n/a".to_string()),
            p.sample_payouts
        );
    }

    println!();
    println!("Most likely next:");
    for (idx, row) in report.likely.iter().enumerate() {
        println!(
            "  {:>2}) {} | {} | {} | remaining {} | ETA {}",
            idx + 1,
            row.location,
            row.model_id,
            row.unit_id,
            fmt_money(Some(row.forecast.remaining)),
            fmt_hours(row.forecast.eta_hours)
        );
    }

    if let Some(card) = report.unit.as_ref() {
        println!();
        println!("Unit {} @ {} ({})", card.unit_id, card.location, card.model_id);
        println!(
            "  activity {} (conf {}) {:?}, recency {:?}",
            card.activity.score, card.activity.confidence, card.heat, card.recency
        );
        if let Some(phase) = card.nominal_phase {
            println!(
                "  nominal cycle {:.0}: phase {:.1}% left {:.0}",
                phase.cycle_in, phase.phase_pct, phase.left
            );
        }
        println!("  {}", describe(&card.prediction));
        println!("  peers:");
        for peer in &report.peers {
            println!("    {} {}", peer.unit_id, describe(&peer.prediction));
        }
    }
}

fn describe(prediction: &Prediction) -> String {
    match prediction {
        Prediction::Insufficient { reason } => reason.to_string(),
        Prediction::Ready(f) => format!(
            "progress {} remaining {} rate {}/h ETA {} payout med {}",
            fmt_money(Some(f.progress)),
            fmt_money(Some(f.remaining)),
            fmt_money(f.rate_per_hour),
            fmt_hours(f.eta_hours),
            fmt_money(f.expected_payout_median)
        ),
    }
}

fn fmt_money(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.0}"))
        .unwrap_or_else(|| "n/a".to_string())
}

fn fmt_hours(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.1}h"))
        .unwrap_or_else(|| "n/a".to_string())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&prefix) {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn parse_arg<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>> {
    match arg_value(args, flag) {
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow!("invalid value for {flag}: {raw}")),
        None => Ok(None),
    }
}
