use chrono::NaiveDateTime;
use serde::Serialize;

use crate::history::HistoryPoint;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityScore {
    pub score: u8,
    pub confidence: u8,
    pub note: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Heat {
    Hot,
    Neutral,
    Cold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Recency {
    Fresh,
    Today,
    NotToday,
    Unknown,
}

const ACTIVITY_TAIL: usize = 6;

/// 0..100 activity index from the most recent delta-out values. More recent
/// output scores higher; confidence grows with samples and drops with spread.
pub fn activity_score(history: &[HistoryPoint]) -> ActivityScore {
    if history.len() < 3 {
        return ActivityScore {
            score: 30,
            confidence: 30,
            note: "sparse history".to_string(),
        };
    }

    let tail = &history[history.len().saturating_sub(ACTIVITY_TAIL)..];
    let deltas: Vec<f64> = tail
        .iter()
        .map(|p| p.delta_out)
        .filter(|v| v.is_finite() && *v >= 0.0)
        .collect();
    if deltas.len() < 3 {
        return ActivityScore {
            score: 35,
            confidence: 35,
            note: "not enough deltas".to_string(),
        };
    }

    let avg = deltas.iter().sum::<f64>() / deltas.len() as f64;
    let max = deltas.iter().copied().fold(0.0, f64::max);
    let spread = if max > 0.0 { (max - avg) / max } else { 0.0 };

    let score = (40.0 + avg * 2.2).round().clamp(0.0, 100.0);
    let confidence = (40.0 + deltas.len() as f64 * 6.0 - spread * 30.0)
        .round()
        .clamp(10.0, 100.0);

    ActivityScore {
        score: score as u8,
        confidence: confidence as u8,
        note: format!("avg delta-out {avg:.0}"),
    }
}

pub fn heat_label(score: u8) -> Heat {
    if score >= 70 {
        Heat::Hot
    } else if score >= 40 {
        Heat::Neutral
    } else {
        Heat::Cold
    }
}

pub fn recency_status(observed_at: Option<NaiveDateTime>, now: NaiveDateTime) -> Recency {
    let Some(observed_at) = observed_at else {
        return Recency::Unknown;
    };
    if observed_at.date() != now.date() {
        return Recency::NotToday;
    }
    let hours = (now - observed_at).num_seconds() as f64 / 3600.0;
    if hours <= 3.0 {
        Recency::Fresh
    } else {
        Recency::Today
    }
}
