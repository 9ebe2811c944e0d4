use std::fmt;
use std::slice;
use std::sync::Arc;

use storage::csv;
use storage::repository::{
    BatchSink, RecordBatch, RecordRepository, RecordRow, RowSink, StorageError,
};
use tracing::{debug, info, warn};
use usability_core::model::{
    RunConfig, ScenarioGuide, SessionToken, StepMetrics, StepRecord, StepStatus,
};
use usability_core::{Clock, RunPosition, RunTransition, TrackerError};

use super::session::ObservationSession;
use super::token::generate_session_token;
use crate::error::ObservationError;

//
// ─── DELIVERY POLICY ──────────────────────────────────────────────────────────
//

/// Where recorded rows go beyond the local journal.
#[derive(Clone, Default)]
pub enum RemotePolicy {
    /// Local journal only.
    #[default]
    Disabled,
    /// Append each row as soon as it is recorded.
    PerStep(Arc<dyn RowSink>),
    /// Upload the whole run once its last page is recorded.
    OnComplete(Arc<dyn BatchSink>),
}

impl RemotePolicy {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            RemotePolicy::Disabled => "disabled",
            RemotePolicy::PerStep(_) => "per_step",
            RemotePolicy::OnComplete(_) => "on_complete",
        }
    }
}

impl fmt::Debug for RemotePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RemotePolicy").field(&self.label()).finish()
    }
}

/// Outcome of handing rows to one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Nothing needed delivering.
    Skipped,
    Delivered { rows: usize },
    /// Rows were kept for a later retry.
    Failed { reason: String },
}

impl Delivery {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Delivery::Failed { .. })
    }

    #[must_use]
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered { .. })
    }
}

//
// ─── INPUTS & OUTCOMES ────────────────────────────────────────────────────────
//

/// Raw per-page observations as entered by the observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepInput {
    pub status: StepStatus,
    pub total_clicks: i64,
    pub wasted_clicks: i64,
    pub error_count: i64,
}

impl StepInput {
    #[must_use]
    pub fn new(
        status: StepStatus,
        total_clicks: i64,
        wasted_clicks: i64,
        error_count: i64,
    ) -> Self {
        Self {
            status,
            total_clicks,
            wasted_clicks,
            error_count,
        }
    }

    fn metrics(self) -> Result<StepMetrics, TrackerError> {
        StepMetrics::new(
            self.status,
            self.total_clicks,
            self.wasted_clicks,
            self.error_count,
        )
    }
}

/// Result of recording a single page.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub record: StepRecord,
    pub transition: RunTransition,
    /// Position after the transition.
    pub position: RunPosition,
    pub journal: Delivery,
    pub remote: Delivery,
}

impl StepOutcome {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.transition.is_complete()
    }
}

/// Result of starting a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStarted {
    pub config: RunConfig,
    pub session: Option<SessionToken>,
    /// Config fragments that were not page counts.
    pub ignored_config: Vec<String>,
    /// Guide lines that could not be used.
    pub ignored_guide: Vec<String>,
    /// Steps of the replaced in-flight run.
    pub discarded_steps: usize,
    /// Delivery of rows left over from the previous run.
    pub flush: Delivery,
}

/// A CSV document ready to be written or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub contents: String,
}

//
// ─── SERVICE ──────────────────────────────────────────────────────────────────
//

/// Orchestrates run start, step recording, and record delivery.
#[derive(Clone)]
pub struct ObservationLoopService {
    clock: Clock,
    journal: Arc<dyn RecordRepository>,
    remote: RemotePolicy,
    session_tokens: bool,
}

impl ObservationLoopService {
    #[must_use]
    pub fn new(clock: Clock, journal: Arc<dyn RecordRepository>) -> Self {
        Self {
            clock,
            journal,
            remote: RemotePolicy::Disabled,
            session_tokens: false,
        }
    }

    #[must_use]
    pub fn with_remote(mut self, remote: RemotePolicy) -> Self {
        self.remote = remote;
        self
    }

    #[must_use]
    pub fn with_session_tokens(mut self, enabled: bool) -> Self {
        self.session_tokens = enabled;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn remote(&self) -> &RemotePolicy {
        &self.remote
    }

    #[must_use]
    pub fn session_tokens(&self) -> bool {
        self.session_tokens
    }

    /// Parse the operator's config and guide text and start a fresh run.
    ///
    /// Rows of a replaced run that never reached the remote sink are flushed
    /// first; a failed flush is reported, not raised.
    ///
    /// # Errors
    ///
    /// Returns `ObservationError::Tracker` if the config has no usable page
    /// counts; the current run is left untouched in that case.
    pub async fn start_run(
        &self,
        session: &mut ObservationSession,
        config_text: &str,
        guide_text: &str,
    ) -> Result<RunStarted, ObservationError> {
        let config = RunConfig::parse(config_text)?;
        let guide = ScenarioGuide::parse(guide_text);
        let token = if self.session_tokens {
            Some(generate_session_token()?)
        } else {
            None
        };

        let discarded_steps = if session.is_active() {
            session.records().len()
        } else {
            0
        };
        if discarded_steps > 0 {
            warn!(
                steps = discarded_steps,
                "starting a new run while another is in progress"
            );
        }
        let flush = self.flush_previous(session).await;

        let now = self.clock.now();
        session.replace_guide(guide.value);
        let run = session
            .tracker_mut()
            .begin(config.value.clone(), token.clone(), now);
        info!(
            tasks = run.config().task_count(),
            pages = run.config().total_pages(),
            session = token.as_ref().map(SessionToken::as_str),
            remote = self.remote.label(),
            "observation run started"
        );

        Ok(RunStarted {
            config: config.value,
            session: token,
            ignored_config: config.ignored,
            ignored_guide: guide.ignored,
            discarded_steps,
            flush,
        })
    }

    /// Record the current page, journal it, and hand it to the remote sink.
    ///
    /// Sink failures never undo the recorded step; they come back as
    /// `Delivery::Failed` and the rows stay pending for `retry_delivery`.
    ///
    /// # Errors
    ///
    /// Returns `ObservationError::Tracker` if no run is active or a metric is
    /// out of range; nothing is recorded in that case.
    pub async fn record_step(
        &self,
        session: &mut ObservationSession,
        input: StepInput,
    ) -> Result<StepOutcome, ObservationError> {
        if !session.is_active() {
            return Err(TrackerError::NoActiveRun.into());
        }
        let metrics = input.metrics()?;
        let now = self.clock.now();
        let (record, transition) = session.tracker_mut().record_step(metrics, now)?;
        let row = RecordRow::from_step(&record);
        debug!(
            task = record.task(),
            page = record.page(),
            status = %record.status(),
            duration_secs = record.duration_secs(),
            %transition,
            "step recorded"
        );

        let journal = match self.journal.append_rows(slice::from_ref(&row)).await {
            Ok(()) => Delivery::Delivered { rows: 1 },
            Err(err) => {
                warn!(error = %err, "failed to journal step");
                Delivery::Failed {
                    reason: err.to_string(),
                }
            }
        };

        let remote = match &self.remote {
            RemotePolicy::Disabled => Delivery::Skipped,
            RemotePolicy::PerStep(sink) => {
                let delivery = deliver_rows(sink.as_ref(), slice::from_ref(&row)).await;
                if delivery.is_failed() {
                    session.push_pending(row);
                }
                delivery
            }
            RemotePolicy::OnComplete(sink) if transition.is_complete() => {
                let rows = session.rows();
                let batch = RecordBatch::named_at(now, rows);
                let delivery = deliver_batch(sink.as_ref(), &batch).await;
                if delivery.is_failed() {
                    session.push_pending_batch(batch);
                }
                delivery
            }
            RemotePolicy::OnComplete(_) => Delivery::Skipped,
        };

        if transition.is_complete() {
            match session.summary() {
                Ok(Some(summary)) => info!(
                    steps = summary.steps(),
                    successes = summary.successes(),
                    failures = summary.failures(),
                    elapsed_secs = summary.elapsed().num_seconds(),
                    "observation run complete"
                ),
                Ok(None) => {}
                Err(err) => warn!(error = %err, "failed to summarize run"),
            }
        }

        Ok(StepOutcome {
            record,
            transition,
            position: session.position(),
            journal,
            remote,
        })
    }

    /// Send rows that the remote sink rejected earlier.
    ///
    /// Loose rows go first, then each queued run upload under its original
    /// file name. Returns the number of rows delivered, zero if nothing was
    /// pending.
    ///
    /// # Errors
    ///
    /// Returns `ObservationError::SinkUnavailable` at the first delivery the
    /// sink still rejects; that delivery and everything after it stay pending.
    pub async fn retry_delivery(
        &self,
        session: &mut ObservationSession,
    ) -> Result<usize, ObservationError> {
        let mut delivered = 0;

        let rows = session.take_pending();
        if !rows.is_empty() {
            if let Err(err) = self.send_rows(&rows).await {
                warn!(rows = rows.len(), error = %err, "retry failed, rows stay pending");
                session.restore_pending(rows);
                return Err(err.into());
            }
            delivered += rows.len();
        }

        let mut batches = session.take_pending_batches().into_iter();
        while let Some(batch) = batches.next() {
            if let Err(err) = self.send_batch(&batch).await {
                warn!(file = %batch.file_name, error = %err, "retry failed, upload stays pending");
                session.restore_pending_batches(std::iter::once(batch).chain(batches).collect());
                return Err(err.into());
            }
            delivered += batch.rows.len();
        }

        if delivered > 0 {
            info!(rows = delivered, "pending rows delivered");
        }
        Ok(delivered)
    }

    /// Render the latest run as CSV named after the current time.
    #[must_use]
    pub fn export_csv(&self, session: &ObservationSession) -> CsvExport {
        CsvExport {
            file_name: csv::export_file_name(self.clock.now()),
            contents: csv::render(&session.rows()),
        }
    }

    /// The newest `limit` journaled rows in recording order, optionally for one
    /// session token.
    ///
    /// # Errors
    ///
    /// Returns `ObservationError::SinkUnavailable` if the journal cannot be read.
    pub async fn journal_rows(
        &self,
        session: Option<&str>,
        limit: u32,
    ) -> Result<Vec<RecordRow>, ObservationError> {
        Ok(self.journal.list_rows(session, limit).await?)
    }

    /// Queue the in-flight run as its own upload, then try everything pending.
    async fn flush_previous(&self, session: &mut ObservationSession) -> Delivery {
        if matches!(self.remote, RemotePolicy::OnComplete(_)) && session.is_active() {
            let rows = session.rows();
            if !rows.is_empty() {
                session.push_pending_batch(RecordBatch::named_at(self.clock.now(), rows));
            }
        }
        if !session.has_pending() {
            return Delivery::Skipped;
        }
        match self.retry_delivery(session).await {
            Ok(rows) => Delivery::Delivered { rows },
            Err(err) => {
                warn!(
                    rows = session.pending_rows().len(),
                    "rows of the replaced run stay pending for a later retry"
                );
                Delivery::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }

    async fn send_rows(&self, rows: &[RecordRow]) -> Result<(), StorageError> {
        match &self.remote {
            RemotePolicy::Disabled => Ok(()),
            RemotePolicy::PerStep(sink) => sink.append_rows(rows).await,
            RemotePolicy::OnComplete(sink) => {
                let batch = RecordBatch::named_at(self.clock.now(), rows.to_vec());
                sink.upload_batch(&batch).await
            }
        }
    }

    async fn send_batch(&self, batch: &RecordBatch) -> Result<(), StorageError> {
        match &self.remote {
            RemotePolicy::Disabled => Ok(()),
            RemotePolicy::PerStep(sink) => sink.append_rows(&batch.rows).await,
            RemotePolicy::OnComplete(sink) => sink.upload_batch(batch).await,
        }
    }
}

async fn deliver_rows(sink: &dyn RowSink, rows: &[RecordRow]) -> Delivery {
    match sink.append_rows(rows).await {
        Ok(()) => Delivery::Delivered { rows: rows.len() },
        Err(err) => {
            warn!(rows = rows.len(), error = %err, "remote append failed");
            Delivery::Failed {
                reason: err.to_string(),
            }
        }
    }
}

async fn deliver_batch(sink: &dyn BatchSink, batch: &RecordBatch) -> Delivery {
    match sink.upload_batch(batch).await {
        Ok(()) => {
            info!(file = %batch.file_name, rows = batch.rows.len(), "run uploaded");
            Delivery::Delivered {
                rows: batch.rows.len(),
            }
        }
        Err(err) => {
            warn!(file = %batch.file_name, error = %err, "run upload failed");
            Delivery::Failed {
                reason: err.to_string(),
            }
        }
    }
}
