use thiserror::Error;

/// Caller contract violations. Noisy data never ends up here; it degrades to
/// dropped records or `Prediction::Insufficient` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FleetError {
    #[error("unknown unit: {0}")]
    UnknownUnit(String),
    #[error("unknown model: {0}")]
    UnknownModel(String),
    #[error("invalid limit: {0} (must be at least 1)")]
    InvalidLimit(usize),
}
