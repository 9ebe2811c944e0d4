//! CSV rendering for exported record tables.

use std::borrow::Cow;

use chrono::{DateTime, Utc};

use crate::repository::RecordRow;

/// Fixed column order of exported rows.
pub const COLUMNS: [&str; 8] = [
    "task",
    "page",
    "status",
    "duration_secs",
    "total_clicks",
    "wasted_clicks",
    "error_count",
    "timestamp",
];

/// Leading column added when rows carry a session token.
pub const SESSION_COLUMN: &str = "session";

#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%H:%M:%S").to_string()
}

#[must_use]
pub fn export_file_name(at: DateTime<Utc>) -> String {
    format!("UsabilityResult_{}.csv", at.format("%H%M%S"))
}

/// Header cells, session column first when requested.
#[must_use]
pub fn header(include_session: bool) -> Vec<&'static str> {
    let mut out = Vec::with_capacity(COLUMNS.len() + 1);
    if include_session {
        out.push(SESSION_COLUMN);
    }
    out.extend(COLUMNS);
    out
}

/// Whether any row carries a session token.
#[must_use]
pub fn has_session(rows: &[RecordRow]) -> bool {
    rows.iter().any(|row| row.session.is_some())
}

/// Render rows as CSV with a header line and CRLF line endings.
#[must_use]
pub fn render(rows: &[RecordRow]) -> String {
    let include_session = has_session(rows);
    let mut out = String::new();
    push_line(&mut out, header(include_session));
    for row in rows {
        push_line(&mut out, row.fields(include_session));
    }
    out
}

fn push_line<S: AsRef<str>>(out: &mut String, cells: impl IntoIterator<Item = S>) {
    for (idx, cell) in cells.into_iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        out.push_str(&escape(cell.as_ref()));
    }
    out.push_str("\r\n");
}

fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}
