#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod observation;
pub mod remote;

pub use usability_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, ObservationError};
pub use observation::{
    CsvExport, Delivery, ObservationLoopService, ObservationProgress, ObservationSession,
    RemotePolicy, RunStarted, StepInput, StepOutcome,
};
pub use remote::{
    DriveConfig, DriveSink, RemoteKind, SheetsConfig, SheetsSink, UnknownRemoteKind,
};
