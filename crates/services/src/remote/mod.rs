//! Remote destinations for recorded rows.

mod drive;
mod sheets;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use reqwest::StatusCode;
use storage::repository::StorageError;
use thiserror::Error;

use crate::error::AppServicesError;
use crate::observation::RemotePolicy;

pub use drive::{DEFAULT_DRIVE_BASE_URL, DriveConfig, DriveSink};
pub use sheets::{DEFAULT_SHEETS_BASE_URL, DEFAULT_SHEETS_RANGE, SheetsConfig, SheetsSink};

/// Which remote sink the app forwards rows to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteKind {
    #[default]
    None,
    /// Spreadsheet append per recorded step.
    Sheets,
    /// One CSV file per finished run.
    Drive,
}

impl RemoteKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RemoteKind::None => "none",
            RemoteKind::Sheets => "sheets",
            RemoteKind::Drive => "drive",
        }
    }

    /// Build the delivery policy, reading sink settings from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::RemoteNotConfigured` if the sink's
    /// variables are missing.
    pub fn policy_from_env(self) -> Result<RemotePolicy, AppServicesError> {
        match self {
            RemoteKind::None => Ok(RemotePolicy::Disabled),
            RemoteKind::Sheets => SheetsConfig::from_env()
                .map(|config| RemotePolicy::PerStep(Arc::new(SheetsSink::new(config))))
                .ok_or(AppServicesError::RemoteNotConfigured {
                    kind: "sheets",
                    hint: "USABILITY_SHEETS_ID and USABILITY_SHEETS_TOKEN",
                }),
            RemoteKind::Drive => DriveConfig::from_env()
                .map(|config| RemotePolicy::OnComplete(Arc::new(DriveSink::new(config))))
                .ok_or(AppServicesError::RemoteNotConfigured {
                    kind: "drive",
                    hint: "USABILITY_DRIVE_FOLDER_ID and USABILITY_DRIVE_TOKEN",
                }),
        }
    }
}

impl fmt::Display for RemoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown remote `{0}` (expected none, sheets or drive)")]
pub struct UnknownRemoteKind(pub String);

impl FromStr for RemoteKind {
    type Err = UnknownRemoteKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "off" => Ok(RemoteKind::None),
            "sheets" => Ok(RemoteKind::Sheets),
            "drive" => Ok(RemoteKind::Drive),
            other => Err(UnknownRemoteKind(other.to_owned())),
        }
    }
}

fn base_url_error(err: impl fmt::Display) -> StorageError {
    StorageError::Remote(format!("invalid base url: {err}"))
}

fn connection_error(err: reqwest::Error) -> StorageError {
    StorageError::Connection(err.to_string())
}

fn status_error(what: &str, status: StatusCode) -> StorageError {
    StorageError::Remote(format!("{what} returned {status}"))
}
