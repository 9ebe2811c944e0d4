use dioxus::prelude::*;
use services::ObservationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewError {
    InvalidConfig,
    NoActiveRun,
    InvalidMetric,
    InvalidNumber,
    SinkUnavailable,
    ExportFailed,
    Unknown,
}

impl ViewError {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            ViewError::InvalidConfig => {
                "Enter page counts as positive numbers separated by commas, e.g. 3, 3, 4."
            }
            ViewError::NoActiveRun => "No run in progress. Start a run first.",
            ViewError::InvalidMetric => "Counts must be zero or more.",
            ViewError::InvalidNumber => "Counts must be whole numbers.",
            ViewError::SinkUnavailable => "Remote storage is unavailable. Try again later.",
            ViewError::ExportFailed => "Could not write the CSV file.",
            ViewError::Unknown => "Something went wrong. Please try again.",
        }
    }
}

impl From<&ObservationError> for ViewError {
    fn from(err: &ObservationError) -> Self {
        if err.is_invalid_config() {
            ViewError::InvalidConfig
        } else if err.is_no_active_run() {
            ViewError::NoActiveRun
        } else if err.is_invalid_metric() {
            ViewError::InvalidMetric
        } else if err.is_sink_unavailable() {
            ViewError::SinkUnavailable
        } else {
            ViewError::Unknown
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ViewState<T> {
    Idle,
    Loading,
    Ready(T),
    Error(ViewError),
}

#[must_use]
pub fn view_state_from_resource<T: Clone>(
    resource: &Resource<Result<T, ViewError>>,
) -> ViewState<T> {
    match resource.state().cloned() {
        UseResourceState::Pending => ViewState::Loading,
        UseResourceState::Ready => match resource.value().read().as_ref() {
            Some(Ok(data)) => ViewState::Ready(data.clone()),
            Some(Err(err)) => ViewState::Error(*err),
            None => ViewState::Error(ViewError::Unknown),
        },
        UseResourceState::Paused | UseResourceState::Stopped => ViewState::Idle,
    }
}
