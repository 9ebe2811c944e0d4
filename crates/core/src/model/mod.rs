mod config;
mod guide;
mod ids;
mod step;
mod summary;

pub(crate) use step::StepTiming;

pub use config::{ConfigError, Parsed, RunConfig};
pub use guide::{DEFAULT_INSTRUCTION, GuideKey, ScenarioGuide};
pub use ids::{MAX_SESSION_TOKEN_LEN, SessionToken, SessionTokenError};
pub use step::{StepMetrics, StepRecord, StepStatus, UnknownStatus};
pub use summary::{RunSummary, RunSummaryError};
