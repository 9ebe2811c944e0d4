use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::model::step::StepRecord;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum RunSummaryError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many records for a single run: {len}")]
    TooManyRecords { len: usize },

    #[error("total steps ({total}) does not match status counts ({sum})")]
    CountMismatch { total: u32, sum: u32 },
}

/// Aggregate numbers for one observation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    steps: u32,
    successes: u32,
    failures: u32,
    total_clicks: u64,
    wasted_clicks: u64,
    errors: u64,
}

impl RunSummary {
    /// Rebuild a summary from stored totals.
    ///
    /// # Errors
    ///
    /// Returns `RunSummaryError::InvalidTimeRange` if the run ends before it starts
    /// and `RunSummaryError::CountMismatch` if the status counts do not add up.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        steps: u32,
        successes: u32,
        failures: u32,
        total_clicks: u64,
        wasted_clicks: u64,
        errors: u64,
    ) -> Result<Self, RunSummaryError> {
        if completed_at < started_at {
            return Err(RunSummaryError::InvalidTimeRange);
        }
        let sum = successes.saturating_add(failures);
        if sum != steps {
            return Err(RunSummaryError::CountMismatch { total: steps, sum });
        }

        Ok(Self {
            started_at,
            completed_at,
            steps,
            successes,
            failures,
            total_clicks,
            wasted_clicks,
            errors,
        })
    }

    /// Build a summary from the records of a run.
    ///
    /// # Errors
    ///
    /// Returns `RunSummaryError::InvalidTimeRange` if `completed_at` is before `started_at`.
    /// Returns `RunSummaryError::TooManyRecords` if the record count cannot fit in `u32`.
    pub fn from_records(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        records: &[StepRecord],
    ) -> Result<Self, RunSummaryError> {
        if completed_at < started_at {
            return Err(RunSummaryError::InvalidTimeRange);
        }
        let mut successes = 0_u32;
        let mut failures = 0_u32;
        let mut total_clicks = 0_u64;
        let mut wasted_clicks = 0_u64;
        let mut errors = 0_u64;

        for record in records {
            if record.status().is_success() {
                successes = successes.saturating_add(1);
            } else {
                failures = failures.saturating_add(1);
            }
            total_clicks += u64::from(record.total_clicks());
            wasted_clicks += u64::from(record.wasted_clicks());
            errors += u64::from(record.error_count());
        }

        let steps = u32::try_from(records.len())
            .map_err(|_| RunSummaryError::TooManyRecords { len: records.len() })?;

        Self::from_persisted(
            started_at,
            completed_at,
            steps,
            successes,
            failures,
            total_clicks,
            wasted_clicks,
            errors,
        )
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.completed_at - self.started_at
    }

    #[must_use]
    pub fn steps(&self) -> u32 {
        self.steps
    }

    #[must_use]
    pub fn successes(&self) -> u32 {
        self.successes
    }

    #[must_use]
    pub fn failures(&self) -> u32 {
        self.failures
    }

    #[must_use]
    pub fn total_clicks(&self) -> u64 {
        self.total_clicks
    }

    #[must_use]
    pub fn wasted_clicks(&self) -> u64 {
        self.wasted_clicks
    }

    #[must_use]
    pub fn errors(&self) -> u64 {
        self.errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn persisted_summary_checks_counts() {
        let now = fixed_now();
        let err = RunSummary::from_persisted(now, now, 3, 1, 1, 0, 0, 0).unwrap_err();
        assert_eq!(err, RunSummaryError::CountMismatch { total: 3, sum: 2 });
    }

    #[test]
    fn persisted_summary_checks_time_range() {
        let now = fixed_now();
        let err = RunSummary::from_persisted(now, now - Duration::seconds(1), 0, 0, 0, 0, 0, 0)
            .unwrap_err();
        assert_eq!(err, RunSummaryError::InvalidTimeRange);
    }

    #[test]
    fn empty_run_summarizes_to_zero() {
        let now = fixed_now();
        let summary = RunSummary::from_records(now, now, &[]).unwrap();
        assert_eq!(summary.steps(), 0);
        assert_eq!(summary.elapsed(), Duration::zero());
    }
}
