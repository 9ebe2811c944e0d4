use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Duration;
use services::{
    Clock, Delivery, ObservationLoopService, ObservationSession, RemotePolicy, StepInput,
};
use storage::repository::{
    BatchSink, InMemoryRecordStore, RecordBatch, RecordRepository, RecordRow, RowSink,
    StorageError,
};
use usability_core::RunTransition;
use usability_core::model::StepStatus;
use usability_core::time::fixed_now;

/// Sink that can be switched between failing and accepting.
#[derive(Default)]
struct FlakySink {
    down: AtomicBool,
    rows: Mutex<Vec<RecordRow>>,
    batches: Mutex<Vec<String>>,
}

impl FlakySink {
    fn down() -> Arc<Self> {
        let sink = Self::default();
        sink.down.store(true, Ordering::SeqCst);
        Arc::new(sink)
    }

    fn recover(&self) {
        self.down.store(false, Ordering::SeqCst);
    }

    fn accept(&self, rows: &[RecordRow]) -> Result<(), StorageError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("sink offline".into()));
        }
        self.rows.lock().unwrap().extend_from_slice(rows);
        Ok(())
    }

    fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl RowSink for FlakySink {
    async fn append_rows(&self, rows: &[RecordRow]) -> Result<(), StorageError> {
        self.accept(rows)
    }
}

#[async_trait::async_trait]
impl BatchSink for FlakySink {
    async fn upload_batch(&self, batch: &RecordBatch) -> Result<(), StorageError> {
        self.accept(&batch.rows)?;
        self.batches.lock().unwrap().push(batch.file_name.clone());
        Ok(())
    }
}

/// Journal that rejects every write.
struct BrokenJournal;

#[async_trait::async_trait]
impl RecordRepository for BrokenJournal {
    async fn append_rows(&self, _rows: &[RecordRow]) -> Result<(), StorageError> {
        Err(StorageError::Connection("disk full".into()))
    }

    async fn list_rows(
        &self,
        _session: Option<&str>,
        _limit: u32,
    ) -> Result<Vec<RecordRow>, StorageError> {
        Ok(Vec::new())
    }
}

fn ok_step() -> StepInput {
    StepInput::new(StepStatus::Success, 4, 1, 0)
}

#[tokio::test]
async fn full_run_walks_every_page_and_journals_rows() {
    let journal = InMemoryRecordStore::new();
    let mut clock = Clock::fixed(fixed_now());
    let base = ObservationLoopService::new(clock, Arc::new(journal.clone()));
    let mut session = ObservationSession::new();

    base.start_run(&mut session, "2, 1", "1-1: Sign in\n2-1: Log out")
        .await
        .unwrap();
    assert_eq!(session.current_instruction(), Some("Sign in"));

    let mut transitions = Vec::new();
    while session.is_active() {
        clock.advance(Duration::seconds(3));
        let svc = base.clone().with_clock(clock);
        let outcome = svc.record_step(&mut session, ok_step()).await.unwrap();
        assert_eq!(outcome.journal, Delivery::Delivered { rows: 1 });
        assert_eq!(outcome.remote, Delivery::Skipped);
        assert_eq!(outcome.record.duration(), Duration::seconds(3));
        transitions.push(outcome.transition);
    }

    assert_eq!(
        transitions,
        vec![
            RunTransition::AdvancePage,
            RunTransition::AdvanceTask,
            RunTransition::RunComplete,
        ]
    );
    let stored = journal.list_rows(None, 100).await.unwrap();
    let pages: Vec<(u64, u32)> = stored.iter().map(|row| (row.task, row.page)).collect();
    assert_eq!(pages, vec![(1, 1), (1, 2), (2, 1)]);

    let summary = session.summary().unwrap().unwrap();
    assert_eq!(summary.steps(), 3);
    assert_eq!(summary.elapsed(), Duration::seconds(9));
    assert_eq!(session.current_instruction(), None);

    let err = base.record_step(&mut session, ok_step()).await.unwrap_err();
    assert!(err.is_no_active_run());
}

#[tokio::test]
async fn per_step_failures_stay_pending_until_retry() {
    let sink = FlakySink::down();
    let svc = ObservationLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(InMemoryRecordStore::new()),
    )
    .with_remote(RemotePolicy::PerStep(sink.clone()));
    let mut session = ObservationSession::new();
    svc.start_run(&mut session, "2", "").await.unwrap();

    let first = svc.record_step(&mut session, ok_step()).await.unwrap();
    assert!(first.remote.is_failed());
    assert_eq!(first.journal, Delivery::Delivered { rows: 1 });
    assert_eq!(session.pending_rows().len(), 1);

    let err = svc.retry_delivery(&mut session).await.unwrap_err();
    assert!(err.is_sink_unavailable());
    assert_eq!(session.pending_rows().len(), 1);

    sink.recover();
    let second = svc.record_step(&mut session, ok_step()).await.unwrap();
    assert_eq!(second.remote, Delivery::Delivered { rows: 1 });
    assert_eq!(svc.retry_delivery(&mut session).await.unwrap(), 1);
    assert!(!session.has_pending());
    assert_eq!(sink.row_count(), 2);
    assert_eq!(svc.retry_delivery(&mut session).await.unwrap(), 0);
}

#[tokio::test]
async fn on_complete_uploads_once_at_the_end() {
    let sink = Arc::new(FlakySink::default());
    let svc = ObservationLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(InMemoryRecordStore::new()),
    )
    .with_remote(RemotePolicy::OnComplete(sink.clone()));
    let mut session = ObservationSession::new();
    svc.start_run(&mut session, "1, 1", "").await.unwrap();

    let first = svc.record_step(&mut session, ok_step()).await.unwrap();
    assert_eq!(first.remote, Delivery::Skipped);
    assert_eq!(sink.row_count(), 0);

    let last = svc.record_step(&mut session, ok_step()).await.unwrap();
    assert!(last.is_complete());
    assert_eq!(last.remote, Delivery::Delivered { rows: 2 });
    assert_eq!(
        *sink.batches.lock().unwrap(),
        vec!["UsabilityResult_221320.csv".to_string()]
    );
}

#[tokio::test]
async fn failed_upload_is_retried_as_one_batch() {
    let sink = FlakySink::down();
    let svc = ObservationLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(InMemoryRecordStore::new()),
    )
    .with_remote(RemotePolicy::OnComplete(sink.clone()));
    let mut session = ObservationSession::new();
    svc.start_run(&mut session, "2", "").await.unwrap();
    svc.record_step(&mut session, ok_step()).await.unwrap();
    let last = svc.record_step(&mut session, ok_step()).await.unwrap();

    assert!(last.remote.is_failed());
    assert_eq!(session.pending_rows().len(), 2);

    sink.recover();
    assert_eq!(svc.retry_delivery(&mut session).await.unwrap(), 2);
    assert_eq!(sink.batches.lock().unwrap().len(), 1);
    assert!(!session.has_pending());
}

#[tokio::test]
async fn restarting_mid_run_flushes_in_flight_rows() {
    let sink = Arc::new(FlakySink::default());
    let svc = ObservationLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(InMemoryRecordStore::new()),
    )
    .with_remote(RemotePolicy::OnComplete(sink.clone()));
    let mut session = ObservationSession::new();
    svc.start_run(&mut session, "3", "").await.unwrap();
    svc.record_step(&mut session, ok_step()).await.unwrap();
    svc.record_step(&mut session, ok_step()).await.unwrap();

    let restarted = svc.start_run(&mut session, "1", "").await.unwrap();
    assert_eq!(restarted.discarded_steps, 2);
    assert_eq!(restarted.flush, Delivery::Delivered { rows: 2 });
    assert_eq!(sink.row_count(), 2);
    assert!(session.records().is_empty());
    assert_eq!(session.position().page_index, 1);
    assert!(session.is_active());
}

#[tokio::test]
async fn restart_with_sink_down_keeps_undelivered_rows_pending() {
    let sink = FlakySink::down();
    let svc = ObservationLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(InMemoryRecordStore::new()),
    )
    .with_remote(RemotePolicy::PerStep(sink.clone()));
    let mut session = ObservationSession::new();
    svc.start_run(&mut session, "2", "").await.unwrap();
    svc.record_step(&mut session, ok_step()).await.unwrap();
    assert_eq!(session.pending_rows().len(), 1);

    let restarted = svc.start_run(&mut session, "1", "").await.unwrap();
    assert!(restarted.flush.is_failed());
    assert_eq!(session.pending_rows().len(), 1);

    svc.record_step(&mut session, ok_step()).await.unwrap();
    assert_eq!(session.pending_rows().len(), 2);

    sink.recover();
    assert_eq!(svc.retry_delivery(&mut session).await.unwrap(), 2);
    assert_eq!(sink.row_count(), 2);
    assert!(!session.has_pending());
}

#[tokio::test]
async fn failed_run_uploads_survive_restarts_as_separate_batches() {
    let sink = FlakySink::down();
    let svc = ObservationLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(InMemoryRecordStore::new()),
    )
    .with_remote(RemotePolicy::OnComplete(sink.clone()));
    let mut session = ObservationSession::new();

    svc.start_run(&mut session, "1", "").await.unwrap();
    let last = svc.record_step(&mut session, ok_step()).await.unwrap();
    assert!(last.remote.is_failed());
    assert_eq!(session.pending_batches().len(), 1);

    let second = svc.start_run(&mut session, "2", "").await.unwrap();
    assert!(second.flush.is_failed());
    assert_eq!(session.pending_batches().len(), 1);

    svc.record_step(&mut session, ok_step()).await.unwrap();
    let third = svc.start_run(&mut session, "1", "").await.unwrap();
    assert!(third.flush.is_failed());
    assert_eq!(session.pending_batches().len(), 2);
    assert_eq!(session.pending_rows().len(), 2);

    sink.recover();
    assert_eq!(svc.retry_delivery(&mut session).await.unwrap(), 2);
    assert_eq!(sink.batches.lock().unwrap().len(), 2);
    assert_eq!(sink.row_count(), 2);
    assert!(!session.has_pending());
}

#[tokio::test]
async fn journal_failure_does_not_undo_the_step() {
    let svc = ObservationLoopService::new(Clock::fixed(fixed_now()), Arc::new(BrokenJournal));
    let mut session = ObservationSession::new();
    svc.start_run(&mut session, "2", "").await.unwrap();

    let outcome = svc.record_step(&mut session, ok_step()).await.unwrap();
    assert!(outcome.journal.is_failed());
    assert_eq!(outcome.transition, RunTransition::AdvancePage);
    assert_eq!(session.records().len(), 1);
    assert_eq!(outcome.position.page_index, 2);
}
