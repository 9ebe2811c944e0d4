use std::path::PathBuf;
use std::sync::Arc;

use services::ObservationLoopService;

pub trait UiApp: Send + Sync {
    fn observation(&self) -> Arc<ObservationLoopService>;
    fn export_dir(&self) -> PathBuf;
}

#[derive(Clone)]
pub struct AppContext {
    observation: Arc<ObservationLoopService>,
    export_dir: PathBuf,
}

impl AppContext {
    #[must_use]
    pub fn new(app: &Arc<dyn UiApp>) -> Self {
        Self {
            observation: app.observation(),
            export_dir: app.export_dir(),
        }
    }

    #[must_use]
    pub fn observation(&self) -> Arc<ObservationLoopService> {
        Arc::clone(&self.observation)
    }

    #[must_use]
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone()
    }
}

// This context is provided by the application composition root (e.g. `crates/app`).

/// Build an `AppContext` from a UI-facing app implementation.
#[must_use]
pub fn build_app_context(app: &Arc<dyn UiApp>) -> AppContext {
    AppContext::new(app)
}
