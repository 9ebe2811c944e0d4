use std::env;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use storage::csv;
use storage::repository::{BatchSink, RecordBatch, RecordRow, RowSink, StorageError};
use tracing::debug;

use super::{base_url_error, connection_error, status_error};

pub const DEFAULT_SHEETS_BASE_URL: &str = "https://sheets.googleapis.com";
pub const DEFAULT_SHEETS_RANGE: &str = "Sheet1!A1";

#[derive(Clone, Debug)]
pub struct SheetsConfig {
    pub base_url: String,
    pub spreadsheet_id: String,
    pub range: String,
    pub access_token: String,
}

impl SheetsConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let access_token = env::var("USABILITY_SHEETS_TOKEN").ok()?;
        let spreadsheet_id = env::var("USABILITY_SHEETS_ID").ok()?;
        if access_token.trim().is_empty() || spreadsheet_id.trim().is_empty() {
            return None;
        }
        let base_url = env::var("USABILITY_SHEETS_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_SHEETS_BASE_URL.into());
        let range =
            env::var("USABILITY_SHEETS_RANGE").unwrap_or_else(|_| DEFAULT_SHEETS_RANGE.into());
        Some(Self {
            base_url,
            spreadsheet_id,
            range,
            access_token,
        })
    }

    /// `values:append` endpoint for the configured sheet range.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Remote` if the base URL is unusable.
    pub fn append_url(&self) -> Result<Url, StorageError> {
        let mut url = Url::parse(self.base_url.trim_end_matches('/')).map_err(base_url_error)?;
        let last = format!("{}:append", self.range);
        url.path_segments_mut()
            .map_err(|()| base_url_error("cannot carry a path"))?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                last.as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED")
            .append_pair("insertDataOption", "INSERT_ROWS");
        Ok(url)
    }
}

/// Appends rows to a spreadsheet range, one request per call.
#[derive(Clone)]
pub struct SheetsSink {
    client: Client,
    config: SheetsConfig,
}

impl SheetsSink {
    #[must_use]
    pub fn new(config: SheetsConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SheetsConfig {
        &self.config
    }

    async fn append(&self, rows: &[RecordRow]) -> Result<(), StorageError> {
        if rows.is_empty() {
            return Ok(());
        }
        let url = self.config.append_url()?;
        let payload = ValueRange::from_rows(rows);

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.access_token)
            .json(&payload)
            .send()
            .await
            .map_err(connection_error)?;

        if !response.status().is_success() {
            return Err(status_error("sheets append", response.status()));
        }
        debug!(rows = rows.len(), "rows appended to sheet");
        Ok(())
    }
}

#[async_trait]
impl RowSink for SheetsSink {
    async fn append_rows(&self, rows: &[RecordRow]) -> Result<(), StorageError> {
        self.append(rows).await
    }
}

#[async_trait]
impl BatchSink for SheetsSink {
    async fn upload_batch(&self, batch: &RecordBatch) -> Result<(), StorageError> {
        self.append(&batch.rows).await
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange {
    major_dimension: &'static str,
    values: Vec<Vec<String>>,
}

impl ValueRange {
    fn from_rows(rows: &[RecordRow]) -> Self {
        let include_session = csv::has_session(rows);
        Self {
            major_dimension: "ROWS",
            values: rows.iter().map(|row| row.fields(include_session)).collect(),
        }
    }
}
