use std::path::{Path, PathBuf};

use services::{
    CsvExport, Delivery, ObservationLoopService, ObservationSession, StepInput,
};
use usability_core::model::StepStatus;

use crate::views::ViewError;
use crate::vm::record_vm::{RecordRowVm, RunSummaryVm, map_record_rows, map_run_summary};

/// Raw text of the per-page form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StepForm {
    pub status: StepStatus,
    pub total_clicks: String,
    pub wasted_clicks: String,
    pub error_count: String,
}

impl Default for StepForm {
    fn default() -> Self {
        Self {
            status: StepStatus::Success,
            total_clicks: "0".into(),
            wasted_clicks: "0".into(),
            error_count: "0".into(),
        }
    }
}

impl StepForm {
    /// # Errors
    ///
    /// Returns `ViewError::InvalidNumber` if a count is not a whole number.
    pub fn to_input(&self) -> Result<StepInput, ViewError> {
        Ok(StepInput::new(
            self.status,
            parse_count(&self.total_clicks)?,
            parse_count(&self.wasted_clicks)?,
            parse_count(&self.error_count)?,
        ))
    }
}

// Empty fields count as zero.
fn parse_count(raw: &str) -> Result<i64, ViewError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse().map_err(|_| ViewError::InvalidNumber)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionVm {
    pub task_label: String,
    pub page_label: String,
    pub progress_label: String,
    pub instruction: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordOutcome {
    Continue,
    Completed,
}

/// Observer-facing state around one `ObservationSession`.
#[derive(Clone, Debug, Default)]
pub struct ObservationVm {
    session: ObservationSession,
    notices: Vec<String>,
}

impl ObservationVm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn session(&self) -> &ObservationSession {
        &self.session
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session.is_active()
    }

    /// Warnings from the last action, e.g. ignored input or failed uploads.
    #[must_use]
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.session.pending_rows().len()
    }

    #[must_use]
    pub fn position(&self) -> Option<PositionVm> {
        let position = self.session.position();
        if !position.is_active {
            return None;
        }
        let task_count = self
            .session
            .tracker()
            .state()
            .map_or(0, |run| run.config().task_count());
        let progress = self.session.progress();
        Some(PositionVm {
            task_label: format!("Task {} of {task_count}", position.task_number()),
            page_label: format!(
                "Page {} of {}",
                position.page_index, position.total_pages_in_task
            ),
            progress_label: format!("Step {} of {}", progress.recorded + 1, progress.total),
            instruction: self
                .session
                .current_instruction()
                .unwrap_or_default()
                .to_string(),
        })
    }

    #[must_use]
    pub fn rows(&self) -> Vec<RecordRowVm> {
        map_record_rows(&self.session.rows())
    }

    /// Summary of a finished run; `None` while running or before any run.
    #[must_use]
    pub fn summary(&self) -> Option<RunSummaryVm> {
        if self.is_active() || self.session.records().is_empty() {
            return None;
        }
        self.session
            .summary()
            .ok()
            .flatten()
            .map(|summary| map_run_summary(&summary))
    }

    /// # Errors
    ///
    /// Returns `ViewError::InvalidConfig` if the page counts are unusable.
    pub async fn start(
        &mut self,
        service: &ObservationLoopService,
        config_text: &str,
        guide_text: &str,
    ) -> Result<(), ViewError> {
        let started = service
            .start_run(&mut self.session, config_text, guide_text)
            .await
            .map_err(|err| ViewError::from(&err))?;

        self.notices.clear();
        if !started.ignored_config.is_empty() {
            self.notices.push(format!(
                "Ignored page counts: {}",
                started.ignored_config.join(", ")
            ));
        }
        if !started.ignored_guide.is_empty() {
            self.notices.push(format!(
                "Ignored guide lines: {}",
                started.ignored_guide.join(" | ")
            ));
        }
        if started.discarded_steps > 0 {
            self.notices.push(format!(
                "Previous run was replaced after {} steps.",
                started.discarded_steps
            ));
        }
        if let Delivery::Failed { reason } = started.flush {
            self.notices
                .push(format!("Previous run could not be uploaded: {reason}"));
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ViewError` if the form is invalid or no run is active.
    pub async fn record(
        &mut self,
        service: &ObservationLoopService,
        form: &StepForm,
    ) -> Result<RecordOutcome, ViewError> {
        let input = form.to_input()?;
        let outcome = service
            .record_step(&mut self.session, input)
            .await
            .map_err(|err| ViewError::from(&err))?;

        self.notices.clear();
        if let Delivery::Failed { reason } = &outcome.journal {
            self.notices
                .push(format!("Local journal write failed: {reason}"));
        }
        if let Delivery::Failed { reason } = &outcome.remote {
            self.notices.push(format!(
                "Remote save failed ({reason}); {} rows waiting for retry.",
                self.pending_count()
            ));
        }

        Ok(if outcome.is_complete() {
            RecordOutcome::Completed
        } else {
            RecordOutcome::Continue
        })
    }

    /// # Errors
    ///
    /// Returns `ViewError::SinkUnavailable` if the remote sink still fails.
    pub async fn retry(&mut self, service: &ObservationLoopService) -> Result<usize, ViewError> {
        let delivered = service
            .retry_delivery(&mut self.session)
            .await
            .map_err(|err| ViewError::from(&err))?;
        self.notices.clear();
        Ok(delivered)
    }

    #[must_use]
    pub fn export(&self, service: &ObservationLoopService) -> CsvExport {
        service.export_csv(&self.session)
    }
}

/// Write an export into `dir`, creating it if needed.
///
/// # Errors
///
/// Returns `ViewError::ExportFailed` if the file cannot be written.
pub async fn write_export(dir: &Path, export: &CsvExport) -> Result<PathBuf, ViewError> {
    tokio::fs::create_dir_all(dir).await.map_err(|err| {
        tracing::warn!(error = %err, dir = %dir.display(), "cannot create export dir");
        ViewError::ExportFailed
    })?;
    let path = dir.join(&export.file_name);
    tokio::fs::write(&path, export.contents.as_bytes())
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, path = %path.display(), "cannot write export");
            ViewError::ExportFailed
        })?;
    tracing::info!(path = %path.display(), "csv exported");
    Ok(path)
}
