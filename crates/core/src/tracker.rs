use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::error::TrackerError;
use crate::model::{
    RunConfig, RunSummary, RunSummaryError, SessionToken, StepMetrics, StepRecord, StepTiming,
};
use crate::time::elapsed_between;

//
// ─── TRANSITIONS ──────────────────────────────────────────────────────────────
//

/// What happened to the run after a step was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RunTransition {
    /// Next page of the same task.
    AdvancePage,
    /// First page of the next task.
    AdvanceTask,
    /// Last page of the last task was recorded; the run is no longer active.
    RunComplete,
}

impl RunTransition {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunTransition::AdvancePage => "advance_page",
            RunTransition::AdvanceTask => "advance_task",
            RunTransition::RunComplete => "run_complete",
        }
    }

    #[must_use]
    pub fn is_complete(self) -> bool {
        matches!(self, RunTransition::RunComplete)
    }
}

impl fmt::Display for RunTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── POSITION ─────────────────────────────────────────────────────────────────
//

/// Snapshot of where the run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunPosition {
    /// 0-based task index.
    pub task_index: usize,
    /// 1-based page index within the task.
    pub page_index: u32,
    /// Page count of the current task, 0 once the run has moved past the last task.
    pub total_pages_in_task: u32,
    pub is_active: bool,
}

impl RunPosition {
    fn idle() -> Self {
        Self {
            task_index: 0,
            page_index: 1,
            total_pages_in_task: 0,
            is_active: false,
        }
    }

    /// 1-based task number for display.
    #[must_use]
    pub fn task_number(&self) -> usize {
        self.task_index + 1
    }
}

//
// ─── RUN STATE ────────────────────────────────────────────────────────────────
//

/// Mutable state of one observation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    config: RunConfig,
    session: Option<SessionToken>,
    task_index: usize,
    page_index: u32,
    active: bool,
    started_at: DateTime<Utc>,
    lap_anchor: DateTime<Utc>,
    records: Vec<StepRecord>,
}

impl RunState {
    fn start(config: RunConfig, session: Option<SessionToken>, now: DateTime<Utc>) -> Self {
        Self {
            config,
            session,
            task_index: 0,
            page_index: 1,
            active: true,
            started_at: now,
            lap_anchor: now,
            records: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> Option<&SessionToken> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn task_index(&self) -> usize {
        self.task_index
    }

    #[must_use]
    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Timestamp the next step's duration is measured from.
    #[must_use]
    pub fn lap_anchor(&self) -> DateTime<Utc> {
        self.lap_anchor
    }

    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    fn position(&self) -> RunPosition {
        RunPosition {
            task_index: self.task_index,
            page_index: self.page_index,
            total_pages_in_task: self.config.pages_in_task(self.task_index).unwrap_or(0),
            is_active: self.active,
        }
    }
}

//
// ─── TRACKER ──────────────────────────────────────────────────────────────────
//

/// Task/page progression and timing state machine for one observer session.
///
/// Idle until `begin`; each `record_step` appends exactly one record and moves
/// to the next page, the next task, or back to idle after the last page of the
/// last task. The tracker performs no I/O and never reads the clock itself.
#[derive(Debug, Clone, Default)]
pub struct RunTracker {
    run: Option<RunState>,
}

impl RunTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new run, replacing any previous one.
    ///
    /// Records of a still-active run are discarded; callers that care take
    /// them with `records()` first.
    pub fn begin(
        &mut self,
        config: RunConfig,
        session: Option<SessionToken>,
        now: DateTime<Utc>,
    ) -> &RunState {
        self.run.insert(RunState::start(config, session, now))
    }

    /// Validate raw page counts and start a run.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::InvalidConfig` for an empty list or non-positive
    /// counts; the previous run is left untouched.
    pub fn begin_with_counts<I>(
        &mut self,
        counts: I,
        session: Option<SessionToken>,
        now: DateTime<Utc>,
    ) -> Result<&RunState, TrackerError>
    where
        I: IntoIterator<Item = i64>,
    {
        let config = RunConfig::new(counts)?;
        Ok(self.begin(config, session, now))
    }

    /// Record the current page and advance.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::NoActiveRun` if no run is active; nothing is
    /// modified in that case.
    pub fn record_step(
        &mut self,
        metrics: StepMetrics,
        now: DateTime<Utc>,
    ) -> Result<(StepRecord, RunTransition), TrackerError> {
        let Some(run) = self.run.as_mut().filter(|run| run.active) else {
            return Err(TrackerError::NoActiveRun);
        };
        let Some(pages_in_task) = run.config.pages_in_task(run.task_index) else {
            return Err(TrackerError::NoActiveRun);
        };

        let record = StepRecord::capture(
            StepTiming {
                task: run.task_index + 1,
                page: run.page_index,
                duration: elapsed_between(run.lap_anchor, now),
                elapsed_total: elapsed_between(run.started_at, now),
                captured_at: now,
            },
            metrics,
            run.session.clone(),
        );
        run.records.push(record.clone());
        run.lap_anchor = now;

        let transition = if run.page_index < pages_in_task {
            run.page_index += 1;
            RunTransition::AdvancePage
        } else {
            run.task_index += 1;
            run.page_index = 1;
            if run.task_index == run.config.task_count() {
                run.active = false;
                RunTransition::RunComplete
            } else {
                RunTransition::AdvanceTask
            }
        };

        Ok((record, transition))
    }

    #[must_use]
    pub fn current_position(&self) -> RunPosition {
        self.run
            .as_ref()
            .map_or_else(RunPosition::idle, RunState::position)
    }

    /// Records of the active or most recently finished run.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        self.run
            .as_ref()
            .map(RunState::records)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn state(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.run.as_ref().is_some_and(RunState::is_active)
    }

    #[must_use]
    pub fn session(&self) -> Option<&SessionToken> {
        self.run.as_ref().and_then(RunState::session)
    }

    /// Summary of the latest run, measured up to its last recorded step.
    ///
    /// # Errors
    ///
    /// Returns `RunSummaryError` if the records cannot be aggregated.
    pub fn summary(&self) -> Result<Option<RunSummary>, RunSummaryError> {
        let Some(run) = self.run.as_ref() else {
            return Ok(None);
        };
        let completed_at = run
            .records
            .last()
            .map_or(run.started_at, |last| run.started_at + last.elapsed_total());
        RunSummary::from_records(run.started_at, completed_at, &run.records).map(Some)
    }
}
