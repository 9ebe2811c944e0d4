use storage::repository::RecordRow;
use usability_core::model::RunSummary;

use crate::vm::time_fmt::{format_clock_time, format_elapsed, format_secs};

/// One table line of recorded steps, pre-formatted for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordRowVm {
    pub session: Option<String>,
    pub task: u64,
    pub page: u32,
    pub status: String,
    pub is_success: bool,
    pub duration: String,
    pub total_clicks: u32,
    pub wasted_clicks: u32,
    pub error_count: u32,
    pub timestamp: String,
}

#[must_use]
pub fn map_record_rows(rows: &[RecordRow]) -> Vec<RecordRowVm> {
    rows.iter()
        .map(|row| RecordRowVm {
            session: row.session.clone(),
            task: row.task,
            page: row.page,
            status: row.status.clone(),
            is_success: row.status == "SUCCESS",
            duration: format_secs(row.duration_secs),
            total_clicks: row.total_clicks,
            wasted_clicks: row.wasted_clicks,
            error_count: row.error_count,
            timestamp: format_clock_time(row.captured_at),
        })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummaryVm {
    pub steps: u32,
    pub successes: u32,
    pub failures: u32,
    pub total_clicks: u64,
    pub wasted_clicks: u64,
    pub errors: u64,
    pub elapsed: String,
}

#[must_use]
pub fn map_run_summary(summary: &RunSummary) -> RunSummaryVm {
    RunSummaryVm {
        steps: summary.steps(),
        successes: summary.successes(),
        failures: summary.failures(),
        total_clicks: summary.total_clicks(),
        wasted_clicks: summary.wasted_clicks(),
        errors: summary.errors(),
        elapsed: format_elapsed(summary.elapsed()),
    }
}
