use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use usability_core::model::StepRecord;

use crate::csv;

/// Errors surfaced by storage adapters and remote sinks.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("remote sink rejected the request: {0}")]
    Remote(String),
}

/// Persisted/exported shape of a step record.
///
/// Field order matches the exported column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordRow {
    pub session: Option<String>,
    pub task: u64,
    pub page: u32,
    pub status: String,
    pub duration_secs: f64,
    pub total_clicks: u32,
    pub wasted_clicks: u32,
    pub error_count: u32,
    pub captured_at: DateTime<Utc>,
}

impl RecordRow {
    #[must_use]
    pub fn from_step(record: &StepRecord) -> Self {
        Self {
            session: record.session().map(ToString::to_string),
            task: u64::try_from(record.task()).unwrap_or(u64::MAX),
            page: record.page(),
            status: record.status().as_str().to_owned(),
            duration_secs: record.duration_secs(),
            total_clicks: record.total_clicks(),
            wasted_clicks: record.wasted_clicks(),
            error_count: record.error_count(),
            captured_at: record.captured_at(),
        }
    }

    /// Column values as text, with the session column first when requested.
    #[must_use]
    pub fn fields(&self, include_session: bool) -> Vec<String> {
        let mut out = Vec::with_capacity(csv::COLUMNS.len() + 1);
        if include_session {
            out.push(self.session.clone().unwrap_or_default());
        }
        out.push(self.task.to_string());
        out.push(self.page.to_string());
        out.push(self.status.clone());
        out.push(format!("{:.2}", self.duration_secs));
        out.push(self.total_clicks.to_string());
        out.push(self.wasted_clicks.to_string());
        out.push(self.error_count.to_string());
        out.push(csv::format_timestamp(self.captured_at));
        out
    }
}

/// Rows of one run bundled for a single upload.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordBatch {
    pub file_name: String,
    pub rows: Vec<RecordRow>,
}

impl RecordBatch {
    #[must_use]
    pub fn new(file_name: impl Into<String>, rows: Vec<RecordRow>) -> Self {
        Self {
            file_name: file_name.into(),
            rows,
        }
    }

    /// Batch named after the export timestamp, e.g. `UsabilityResult_142501.csv`.
    #[must_use]
    pub fn named_at(at: DateTime<Utc>, rows: Vec<RecordRow>) -> Self {
        Self::new(csv::export_file_name(at), rows)
    }

    #[must_use]
    pub fn to_csv(&self) -> String {
        csv::render(&self.rows)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Append-only journal of step rows.
#[async_trait]
pub trait RecordRepository: Send + Sync {
    /// Append rows in order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be stored.
    async fn append_rows(&self, rows: &[RecordRow]) -> Result<(), StorageError>;

    /// List the newest `limit` stored rows in insertion order, optionally for
    /// one session token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be read.
    async fn list_rows(
        &self,
        session: Option<&str>,
        limit: u32,
    ) -> Result<Vec<RecordRow>, StorageError>;
}

/// Destination that accepts rows as they are recorded.
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Append rows to the destination.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the destination is unavailable or rejects them.
    async fn append_rows(&self, rows: &[RecordRow]) -> Result<(), StorageError>;
}

/// Destination that receives a whole run at once.
#[async_trait]
pub trait BatchSink: Send + Sync {
    /// Upload a complete batch.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the destination is unavailable or rejects it.
    async fn upload_batch(&self, batch: &RecordBatch) -> Result<(), StorageError>;
}

/// In-memory record table for tests and sessions without a database.
#[derive(Clone, Default)]
pub struct InMemoryRecordStore {
    rows: Arc<Mutex<Vec<RecordRow>>>,
    batches: Arc<Mutex<Vec<String>>>,
}

impl InMemoryRecordStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// File names of the batches uploaded so far.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the store lock is poisoned.
    pub fn uploaded_batches(&self) -> Result<Vec<String>, StorageError> {
        let guard = self
            .batches
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    fn push_rows(&self, rows: &[RecordRow]) -> Result<(), StorageError> {
        let mut guard = self
            .rows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.extend_from_slice(rows);
        Ok(())
    }
}

#[async_trait]
impl RecordRepository for InMemoryRecordStore {
    async fn append_rows(&self, rows: &[RecordRow]) -> Result<(), StorageError> {
        self.push_rows(rows)
    }

    async fn list_rows(
        &self,
        session: Option<&str>,
        limit: u32,
    ) -> Result<Vec<RecordRow>, StorageError> {
        let guard = self
            .rows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let matching: Vec<&RecordRow> = guard
            .iter()
            .filter(|row| session.is_none_or(|s| row.session.as_deref() == Some(s)))
            .collect();
        let skip = matching.len().saturating_sub(limit);
        Ok(matching.into_iter().skip(skip).cloned().collect())
    }
}

#[async_trait]
impl RowSink for InMemoryRecordStore {
    async fn append_rows(&self, rows: &[RecordRow]) -> Result<(), StorageError> {
        self.push_rows(rows)
    }
}

#[async_trait]
impl BatchSink for InMemoryRecordStore {
    async fn upload_batch(&self, batch: &RecordBatch) -> Result<(), StorageError> {
        self.push_rows(&batch.rows)?;
        let mut guard = self
            .batches
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(batch.file_name.clone());
        Ok(())
    }
}

/// Local journal behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub records: Arc<dyn RecordRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let records: Arc<dyn RecordRepository> = Arc::new(InMemoryRecordStore::new());
        Self { records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usability_core::RunTracker;
    use usability_core::model::{RunConfig, SessionToken, StepMetrics, StepStatus};
    use usability_core::time::fixed_now;

    fn recorded_rows(token: Option<&str>) -> Vec<RecordRow> {
        let mut tracker = RunTracker::new();
        let session = token.map(|t| SessionToken::new(t).unwrap());
        tracker.begin(RunConfig::new([2]).unwrap(), session, fixed_now());
        let metrics = StepMetrics::new(StepStatus::Success, 4, 1, 0).unwrap();
        tracker
            .record_step(metrics, fixed_now() + chrono::Duration::milliseconds(1234))
            .unwrap();
        tracker.record_step(metrics, fixed_now()).unwrap();
        tracker.records().iter().map(RecordRow::from_step).collect()
    }

    #[test]
    fn row_fields_follow_column_order() {
        let rows = recorded_rows(Some("tok1"));
        assert_eq!(
            rows[0].fields(true),
            vec!["tok1", "1", "1", "SUCCESS", "1.23", "4", "1", "0", "22:13:21"]
        );
        assert_eq!(rows[0].fields(false).len(), csv::COLUMNS.len());
    }

    #[tokio::test]
    async fn in_memory_store_filters_by_session() {
        let store = InMemoryRecordStore::new();
        RecordRepository::append_rows(&store, &recorded_rows(Some("aaa")))
            .await
            .unwrap();
        RecordRepository::append_rows(&store, &recorded_rows(Some("bbb")))
            .await
            .unwrap();

        assert_eq!(store.list_rows(None, 100).await.unwrap().len(), 4);
        let only_b = store.list_rows(Some("bbb"), 100).await.unwrap();
        assert_eq!(only_b.len(), 2);
        assert!(only_b.iter().all(|r| r.session.as_deref() == Some("bbb")));
        assert_eq!(store.list_rows(None, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn in_memory_limit_keeps_the_newest_rows() {
        let store = InMemoryRecordStore::new();
        for token in ["old1", "mid1", "new1"] {
            RecordRepository::append_rows(&store, &recorded_rows(Some(token)))
                .await
                .unwrap();
        }

        let newest = store.list_rows(None, 3).await.unwrap();
        let sessions: Vec<_> = newest.iter().map(|r| r.session.as_deref()).collect();
        assert_eq!(sessions, vec![Some("mid1"), Some("new1"), Some("new1")]);
        assert_eq!(newest[2].page, 2);

        let scoped = store.list_rows(Some("old1"), 1).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].page, 2);
    }

    #[tokio::test]
    async fn batch_upload_records_file_name() {
        let store = InMemoryRecordStore::new();
        let batch = RecordBatch::named_at(fixed_now(), recorded_rows(None));
        store.upload_batch(&batch).await.unwrap();
        assert_eq!(
            store.uploaded_batches().unwrap(),
            vec!["UsabilityResult_221320.csv".to_string()]
        );
        assert_eq!(store.list_rows(None, 10).await.unwrap().len(), 2);
    }
}
