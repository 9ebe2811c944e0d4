mod observation_vm;
mod record_vm;
mod time_fmt;

pub use observation_vm::{
    ObservationVm, PositionVm, RecordOutcome, StepForm, write_export,
};
pub use record_vm::{RecordRowVm, RunSummaryVm, map_record_rows, map_run_summary};
pub use time_fmt::{format_clock_time, format_elapsed, format_secs};
