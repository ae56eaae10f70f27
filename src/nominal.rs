use serde::{Deserialize, Serialize};

use crate::stats::round_to;

/// Manufacturer-declared cycle for a model, loaded by the caller alongside the
/// snapshots. Independent of the statistically estimated cycle in `ModelProfile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NominalCycle {
    pub model_id: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub cycle_in: Option<f64>,
    #[serde(default)]
    pub payout_pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CyclePhase {
    pub cycle_in: f64,
    pub phase_pct: f64,
    pub left: f64,
    pub payout_pct: Option<f64>,
}

/// Position of the unit's cumulative input within its nominal cycle.
pub fn cycle_phase(cumulative_in: f64, nominal: &NominalCycle) -> Option<CyclePhase> {
    let cycle = nominal.cycle_in.filter(|c| c.is_finite() && *c > 0.0)?;
    if !cumulative_in.is_finite() {
        return None;
    }
    let modulo = cumulative_in.rem_euclid(cycle);
    Some(CyclePhase {
        cycle_in: cycle,
        phase_pct: round_to(modulo / cycle * 100.0, 1),
        left: (cycle - modulo).round(),
        payout_pct: nominal.payout_pct,
    })
}

#[cfg(test)]
mod tests {
    use super::{NominalCycle, cycle_phase};

    fn nominal(cycle_in: Option<f64>) -> NominalCycle {
        NominalCycle {
            model_id: "M1".to_string(),
            model_name: "Model One".to_string(),
            cycle_in,
            payout_pct: Some(65.0),
        }
    }

    #[test]
    fn phase_wraps_cumulative_input() {
        let phase = cycle_phase(2_750.0, &nominal(Some(1_000.0))).unwrap();
        assert_eq!(phase.phase_pct, 75.0);
        assert_eq!(phase.left, 250.0);
        assert_eq!(phase.payout_pct, Some(65.0));
    }

    #[test]
    fn missing_or_zero_cycle_has_no_phase() {
        assert!(cycle_phase(500.0, &nominal(None)).is_none());
        assert!(cycle_phase(500.0, &nominal(Some(0.0))).is_none());
    }
}
