mod progress;
mod session;
mod token;
mod workflow;

// Public API of the observation subsystem.
pub use crate::error::ObservationError;
pub use progress::ObservationProgress;
pub use session::ObservationSession;
pub use token::{SESSION_TOKEN_LEN, generate_session_token};
pub use workflow::{
    CsvExport, Delivery, ObservationLoopService, RemotePolicy, RunStarted, StepInput, StepOutcome,
};
