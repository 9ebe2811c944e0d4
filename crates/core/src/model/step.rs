use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::error::TrackerError;
use crate::model::ids::SessionToken;
use crate::time::duration_secs;

//
// ─── STEP STATUS ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown step status: {0}")]
pub struct UnknownStatus(pub String);

/// Pass/fail verdict the observer gives for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepStatus {
    Success,
    Failure,
}

impl StepStatus {
    /// Label used in exported rows.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Success => "SUCCESS",
            StepStatus::Failure => "FAILURE",
        }
    }

    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, StepStatus::Success)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => Ok(Self::Success),
            "FAILURE" => Ok(Self::Failure),
            _ => Err(UnknownStatus(s.to_owned())),
        }
    }
}

//
// ─── STEP METRICS ─────────────────────────────────────────────────────────────
//

/// Observer-supplied counts for a single page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMetrics {
    status: StepStatus,
    total_clicks: u32,
    wasted_clicks: u32,
    error_count: u32,
}

fn count(field: &'static str, value: i64) -> Result<u32, TrackerError> {
    u32::try_from(value).map_err(|_| TrackerError::InvalidMetric { field, value })
}

impl StepMetrics {
    /// Validate raw counts coming from the input layer.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::InvalidMetric` for negative counts or counts that
    /// do not fit in `u32`.
    pub fn new(
        status: StepStatus,
        total_clicks: i64,
        wasted_clicks: i64,
        error_count: i64,
    ) -> Result<Self, TrackerError> {
        Ok(Self {
            status,
            total_clicks: count("total_clicks", total_clicks)?,
            wasted_clicks: count("wasted_clicks", wasted_clicks)?,
            error_count: count("error_count", error_count)?,
        })
    }

    #[must_use]
    pub fn status(&self) -> StepStatus {
        self.status
    }

    #[must_use]
    pub fn total_clicks(&self) -> u32 {
        self.total_clicks
    }

    #[must_use]
    pub fn wasted_clicks(&self) -> u32 {
        self.wasted_clicks
    }

    #[must_use]
    pub fn error_count(&self) -> u32 {
        self.error_count
    }
}

//
// ─── STEP RECORD ──────────────────────────────────────────────────────────────
//

/// Immutable record of one observed page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    task: usize,
    page: u32,
    metrics: StepMetrics,
    duration: Duration,
    elapsed_total: Duration,
    captured_at: DateTime<Utc>,
    session: Option<SessionToken>,
}

/// Position and timing captured by the tracker for a new record.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StepTiming {
    pub task: usize,
    pub page: u32,
    pub duration: Duration,
    pub elapsed_total: Duration,
    pub captured_at: DateTime<Utc>,
}

impl StepRecord {
    pub(crate) fn capture(
        timing: StepTiming,
        metrics: StepMetrics,
        session: Option<SessionToken>,
    ) -> Self {
        Self {
            task: timing.task,
            page: timing.page,
            metrics,
            duration: timing.duration,
            elapsed_total: timing.elapsed_total,
            captured_at: timing.captured_at,
            session,
        }
    }

    /// 1-based task number.
    #[must_use]
    pub fn task(&self) -> usize {
        self.task
    }

    /// 1-based page number within the task.
    #[must_use]
    pub fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn status(&self) -> StepStatus {
        self.metrics.status()
    }

    #[must_use]
    pub fn metrics(&self) -> &StepMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn total_clicks(&self) -> u32 {
        self.metrics.total_clicks()
    }

    #[must_use]
    pub fn wasted_clicks(&self) -> u32 {
        self.metrics.wasted_clicks()
    }

    #[must_use]
    pub fn error_count(&self) -> u32 {
        self.metrics.error_count()
    }

    /// Time since the previous step, or since the run started for the first one.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    #[must_use]
    pub fn duration_secs(&self) -> f64 {
        duration_secs(self.duration)
    }

    /// Time since the run started.
    #[must_use]
    pub fn elapsed_total(&self) -> Duration {
        self.elapsed_total
    }

    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    #[must_use]
    pub fn session(&self) -> Option<&SessionToken> {
        self.session.as_ref()
    }
}
