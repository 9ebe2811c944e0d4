use storage::repository::{RecordBatch, RecordRow};
use usability_core::model::{RunSummary, RunSummaryError, ScenarioGuide, StepRecord};
use usability_core::{RunPosition, RunTracker};

use super::progress::ObservationProgress;

/// One observer's working state: the run tracker, the scenario guide
/// shown next to it, and rows the remote sink has not accepted yet.
#[derive(Debug, Clone, Default)]
pub struct ObservationSession {
    tracker: RunTracker,
    guide: ScenarioGuide,
    pending: Vec<RecordRow>,
    pending_batches: Vec<RecordBatch>,
}

impl ObservationSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tracker(&self) -> &RunTracker {
        &self.tracker
    }

    #[must_use]
    pub fn guide(&self) -> &ScenarioGuide {
        &self.guide
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.tracker.is_active()
    }

    #[must_use]
    pub fn position(&self) -> RunPosition {
        self.tracker.current_position()
    }

    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        self.tracker.records()
    }

    /// Rows recorded so far, in the shape they are stored and exported.
    #[must_use]
    pub fn rows(&self) -> Vec<RecordRow> {
        self.records().iter().map(RecordRow::from_step).collect()
    }

    /// Guide instruction for the current page, `None` while idle.
    #[must_use]
    pub fn current_instruction(&self) -> Option<&str> {
        let position = self.position();
        position
            .is_active
            .then(|| self.guide.instruction(position.task_index, position.page_index))
    }

    /// Rows waiting for a successful remote delivery, loose rows first and
    /// then the rows of each undelivered run upload.
    #[must_use]
    pub fn pending_rows(&self) -> Vec<RecordRow> {
        self.pending
            .iter()
            .chain(self.pending_batches.iter().flat_map(|batch| &batch.rows))
            .cloned()
            .collect()
    }

    /// Run uploads that still have to be sent, oldest first.
    #[must_use]
    pub fn pending_batches(&self) -> &[RecordBatch] {
        &self.pending_batches
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty() || !self.pending_batches.is_empty()
    }

    #[must_use]
    pub fn progress(&self) -> ObservationProgress {
        let recorded = u64::try_from(self.records().len()).unwrap_or(u64::MAX);
        let total = self
            .tracker
            .state()
            .map_or(0, |run| run.config().total_pages());
        ObservationProgress {
            total,
            recorded,
            remaining: total.saturating_sub(recorded),
            is_complete: total > 0 && !self.is_active(),
        }
    }

    /// Summary of the latest run, if one was started.
    ///
    /// # Errors
    ///
    /// Returns `RunSummaryError` if the records cannot be aggregated.
    pub fn summary(&self) -> Result<Option<RunSummary>, RunSummaryError> {
        self.tracker.summary()
    }

    pub(crate) fn tracker_mut(&mut self) -> &mut RunTracker {
        &mut self.tracker
    }

    pub(crate) fn replace_guide(&mut self, guide: ScenarioGuide) {
        self.guide = guide;
    }

    pub(crate) fn push_pending(&mut self, row: RecordRow) {
        self.pending.push(row);
    }

    pub(crate) fn push_pending_batch(&mut self, batch: RecordBatch) {
        self.pending_batches.push(batch);
    }

    pub(crate) fn take_pending(&mut self) -> Vec<RecordRow> {
        std::mem::take(&mut self.pending)
    }

    pub(crate) fn take_pending_batches(&mut self) -> Vec<RecordBatch> {
        std::mem::take(&mut self.pending_batches)
    }

    /// Put rows back ahead of anything queued since they were taken.
    pub(crate) fn restore_pending(&mut self, mut rows: Vec<RecordRow>) {
        rows.append(&mut self.pending);
        self.pending = rows;
    }

    pub(crate) fn restore_pending_batches(&mut self, mut batches: Vec<RecordBatch>) {
        batches.append(&mut self.pending_batches);
        self.pending_batches = batches;
    }
}
