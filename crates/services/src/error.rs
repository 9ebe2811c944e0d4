//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use usability_core::TrackerError;
use usability_core::model::{ConfigError, RunSummaryError, SessionTokenError};

/// Errors emitted by the observation loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ObservationError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error("record storage is unavailable: {0}")]
    SinkUnavailable(#[from] StorageError),
    #[error(transparent)]
    Summary(#[from] RunSummaryError),
    #[error(transparent)]
    SessionToken(#[from] SessionTokenError),
}

impl From<ConfigError> for ObservationError {
    fn from(err: ConfigError) -> Self {
        Self::Tracker(TrackerError::InvalidConfig(err))
    }
}

impl ObservationError {
    #[must_use]
    pub fn is_invalid_config(&self) -> bool {
        matches!(self, Self::Tracker(TrackerError::InvalidConfig(_)))
    }

    #[must_use]
    pub fn is_no_active_run(&self) -> bool {
        matches!(self, Self::Tracker(TrackerError::NoActiveRun))
    }

    #[must_use]
    pub fn is_invalid_metric(&self) -> bool {
        matches!(self, Self::Tracker(TrackerError::InvalidMetric { .. }))
    }

    #[must_use]
    pub fn is_sink_unavailable(&self) -> bool {
        matches!(self, Self::SinkUnavailable(_))
    }
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error("remote sink `{kind}` is missing configuration: set {hint}")]
    RemoteNotConfigured {
        kind: &'static str,
        hint: &'static str,
    },
}
