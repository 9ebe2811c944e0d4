use thiserror::Error;

use crate::model::ConfigError;

/// Errors reported by the run tracker.
///
/// All of them are recoverable and meant to be shown to the observer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrackerError {
    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),

    #[error("no observation run is active")]
    NoActiveRun,

    #[error("{field} must be a non-negative count, got {value}")]
    InvalidMetric { field: &'static str, value: i64 },
}
