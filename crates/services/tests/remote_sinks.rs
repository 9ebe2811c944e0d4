use mockito::{Matcher, Server};
use serde_json::json;
use services::{DriveConfig, DriveSink, SheetsConfig, SheetsSink};
use storage::repository::{BatchSink, RecordBatch, RecordRow, RowSink, StorageError};
use usability_core::time::fixed_now;

const SHEETS_PATH: &str = "/v4/spreadsheets/sheet123/values/Sheet1!A1:append";
const DRIVE_PATH: &str = "/upload/drive/v3/files";
const MULTIPART: &str = "multipart/related; boundary=usability-record-batch";

fn row(page: u32, status: &str) -> RecordRow {
    RecordRow {
        session: None,
        task: 1,
        page,
        status: status.into(),
        duration_secs: 2.5,
        total_clicks: 4,
        wasted_clicks: 1,
        error_count: 0,
        captured_at: fixed_now(),
    }
}

fn sheets(base_url: String) -> SheetsSink {
    SheetsSink::new(SheetsConfig {
        base_url,
        spreadsheet_id: "sheet123".into(),
        range: "Sheet1!A1".into(),
        access_token: "sheet-token".into(),
    })
}

fn drive(base_url: String) -> DriveSink {
    DriveSink::new(DriveConfig {
        base_url,
        folder_id: "folder42".into(),
        access_token: "drive-token".into(),
    })
}

fn append_query() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("valueInputOption".into(), "USER_ENTERED".into()),
        Matcher::UrlEncoded("insertDataOption".into(), "INSERT_ROWS".into()),
    ])
}

#[tokio::test]
async fn sheets_append_posts_rows_with_bearer_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", SHEETS_PATH)
        .match_query(append_query())
        .match_header("authorization", "Bearer sheet-token")
        .match_body(Matcher::Json(json!({
            "majorDimension": "ROWS",
            "values": [
                ["1", "1", "SUCCESS", "2.50", "4", "1", "0", "22:13:20"],
                ["1", "2", "FAILURE", "2.50", "4", "1", "0", "22:13:20"],
            ],
        })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let rows = [row(1, "SUCCESS"), row(2, "FAILURE")];
    sheets(server.url()).append_rows(&rows).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn sheets_batch_upload_is_a_single_append() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", SHEETS_PATH)
        .match_query(append_query())
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let batch = RecordBatch::named_at(fixed_now(), vec![row(1, "SUCCESS"), row(2, "SUCCESS")]);
    sheets(server.url()).upload_batch(&batch).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn sheets_rejection_maps_to_remote_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", SHEETS_PATH)
        .match_query(append_query())
        .with_status(403)
        .create_async()
        .await;

    let err = sheets(server.url())
        .append_rows(&[row(1, "SUCCESS")])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Remote(ref msg) if msg.contains("403")));
    mock.assert_async().await;
}

#[tokio::test]
async fn sheets_skips_the_request_when_there_is_nothing_to_send() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    sheets(server.url()).append_rows(&[]).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn drive_upload_sends_multipart_csv_into_folder() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", DRIVE_PATH)
        .match_query(Matcher::UrlEncoded("uploadType".into(), "multipart".into()))
        .match_header("authorization", "Bearer drive-token")
        .match_header("content-type", MULTIPART)
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""name":"UsabilityResult_221320\.csv""#.into()),
            Matcher::Regex(r#""parents":\["folder42"\]"#.into()),
            Matcher::Regex("task,page,status".into()),
            Matcher::Regex("1,2,FAILURE,2.50".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"id":"file1"}"#)
        .create_async()
        .await;

    let batch = RecordBatch::named_at(fixed_now(), vec![row(1, "SUCCESS"), row(2, "FAILURE")]);
    drive(server.url()).upload_batch(&batch).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn drive_rejection_maps_to_remote_error() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", DRIVE_PATH)
        .match_query(Matcher::Any)
        .with_status(403)
        .create_async()
        .await;

    let batch = RecordBatch::named_at(fixed_now(), vec![row(1, "SUCCESS")]);
    let err = drive(server.url()).upload_batch(&batch).await.unwrap_err();
    assert!(matches!(err, StorageError::Remote(ref msg) if msg.contains("drive upload returned 403")));
    mock.assert_async().await;
}

#[tokio::test]
async fn unreachable_hosts_map_to_connection_errors() {
    let unreachable = "http://127.0.0.1:1".to_string();

    let err = sheets(unreachable.clone())
        .append_rows(&[row(1, "SUCCESS")])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Connection(_)));

    let batch = RecordBatch::named_at(fixed_now(), vec![row(1, "SUCCESS")]);
    let err = drive(unreachable).upload_batch(&batch).await.unwrap_err();
    assert!(matches!(err, StorageError::Connection(_)));
}
