use std::env;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};
use serde::Serialize;
use storage::repository::{BatchSink, RecordBatch, StorageError};
use tracing::debug;

use super::{base_url_error, connection_error, status_error};

pub const DEFAULT_DRIVE_BASE_URL: &str = "https://www.googleapis.com";

const BOUNDARY: &str = "usability-record-batch";

#[derive(Clone, Debug)]
pub struct DriveConfig {
    pub base_url: String,
    pub folder_id: String,
    pub access_token: String,
}

impl DriveConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let access_token = env::var("USABILITY_DRIVE_TOKEN").ok()?;
        let folder_id = env::var("USABILITY_DRIVE_FOLDER_ID").ok()?;
        if access_token.trim().is_empty() || folder_id.trim().is_empty() {
            return None;
        }
        let base_url =
            env::var("USABILITY_DRIVE_BASE_URL").unwrap_or_else(|_| DEFAULT_DRIVE_BASE_URL.into());
        Some(Self {
            base_url,
            folder_id,
            access_token,
        })
    }

    /// Multipart upload endpoint.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Remote` if the base URL is unusable.
    pub fn upload_url(&self) -> Result<Url, StorageError> {
        let raw = format!(
            "{}/upload/drive/v3/files",
            self.base_url.trim_end_matches('/')
        );
        let mut url = Url::parse(&raw).map_err(base_url_error)?;
        url.query_pairs_mut().append_pair("uploadType", "multipart");
        Ok(url)
    }
}

/// Uploads each finished run as a CSV file into one folder.
#[derive(Clone)]
pub struct DriveSink {
    client: Client,
    config: DriveConfig,
}

impl DriveSink {
    #[must_use]
    pub fn new(config: DriveConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &DriveConfig {
        &self.config
    }
}

#[async_trait]
impl BatchSink for DriveSink {
    async fn upload_batch(&self, batch: &RecordBatch) -> Result<(), StorageError> {
        let url = self.config.upload_url()?;
        let metadata = FileMetadata {
            name: &batch.file_name,
            mime_type: "text/csv",
            parents: vec![self.config.folder_id.as_str()],
        };
        let body = multipart_body(&metadata, &batch.to_csv())?;

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.config.access_token)
            .header(
                CONTENT_TYPE,
                format!("multipart/related; boundary={BOUNDARY}"),
            )
            .body(body)
            .send()
            .await
            .map_err(connection_error)?;

        if !response.status().is_success() {
            return Err(status_error("drive upload", response.status()));
        }
        debug!(file = %batch.file_name, "batch uploaded to drive");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileMetadata<'a> {
    name: &'a str,
    mime_type: &'static str,
    parents: Vec<&'a str>,
}

fn multipart_body(metadata: &FileMetadata<'_>, csv: &str) -> Result<String, StorageError> {
    let metadata =
        serde_json::to_string(metadata).map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(format!(
        "--{BOUNDARY}\r\n\
         Content-Type: application/json; charset=UTF-8\r\n\r\n\
         {metadata}\r\n\
         --{BOUNDARY}\r\n\
         Content-Type: text/csv\r\n\r\n\
         {csv}\r\n\
         --{BOUNDARY}--\r\n"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_url_requests_multipart() {
        let config = DriveConfig {
            base_url: "https://www.googleapis.com/".into(),
            folder_id: "folder".into(),
            access_token: "token".into(),
        };
        assert_eq!(
            config.upload_url().unwrap().as_str(),
            "https://www.googleapis.com/upload/drive/v3/files?uploadType=multipart"
        );
    }

    #[test]
    fn body_carries_metadata_then_csv() {
        let metadata = FileMetadata {
            name: "UsabilityResult_221320.csv",
            mime_type: "text/csv",
            parents: vec!["folder42"],
        };
        let body = multipart_body(&metadata, "task,page\r\n1,1\r\n").unwrap();

        let parts: Vec<&str> = body.split(&format!("--{BOUNDARY}")).collect();
        assert_eq!(parts.len(), 4);
        assert!(parts[1].contains(
            r#"{"name":"UsabilityResult_221320.csv","mimeType":"text/csv","parents":["folder42"]}"#
        ));
        assert!(parts[2].starts_with("\r\nContent-Type: text/csv\r\n\r\ntask,page\r\n1,1"));
        assert_eq!(parts[3], "--\r\n");
    }
}
