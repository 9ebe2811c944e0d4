use std::sync::Arc;

use storage::repository::Storage;
use tracing::info;

use crate::error::AppServicesError;
use crate::observation::{ObservationLoopService, RemotePolicy};
use crate::remote::RemoteKind;
use crate::Clock;

/// Assembles app-facing services around one local journal.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    observation: Arc<ObservationLoopService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, remote sink from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails or the
    /// remote sink is not configured.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        remote: RemoteKind,
        session_tokens: bool,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let policy = remote.policy_from_env()?;
        info!(db = db_url, %remote, session_tokens, "journal opened");
        Ok(Self::from_parts(storage, clock, policy, session_tokens))
    }

    /// Build services with an in-memory journal.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::RemoteNotConfigured` if the remote sink is
    /// not configured.
    pub fn new_in_memory(
        clock: Clock,
        remote: RemoteKind,
        session_tokens: bool,
    ) -> Result<Self, AppServicesError> {
        let policy = remote.policy_from_env()?;
        info!(%remote, session_tokens, "using in-memory journal");
        Ok(Self::from_parts(
            Storage::in_memory(),
            clock,
            policy,
            session_tokens,
        ))
    }

    #[must_use]
    pub fn from_parts(
        storage: Storage,
        clock: Clock,
        remote: RemotePolicy,
        session_tokens: bool,
    ) -> Self {
        let observation = Arc::new(
            ObservationLoopService::new(clock, Arc::clone(&storage.records))
                .with_remote(remote)
                .with_session_tokens(session_tokens),
        );
        Self {
            storage,
            observation,
        }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn observation(&self) -> Arc<ObservationLoopService> {
        Arc::clone(&self.observation)
    }
}
