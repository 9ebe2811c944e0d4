use sqlx::Row;

use super::SqliteRepository;
use crate::repository::{RecordRepository, RecordRow, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn task_to_i64(v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization("task overflow".into()))
}

fn map_record_row(row: &sqlx::sqlite::SqliteRow) -> Result<RecordRow, StorageError> {
    let task: i64 = row.try_get("task").map_err(ser)?;
    Ok(RecordRow {
        session: row.try_get("session").map_err(ser)?,
        task: u64::try_from(task)
            .map_err(|_| StorageError::Serialization(format!("invalid task: {task}")))?,
        page: u32_from_i64("page", row.try_get("page").map_err(ser)?)?,
        status: row.try_get("status").map_err(ser)?,
        duration_secs: row.try_get("duration_secs").map_err(ser)?,
        total_clicks: u32_from_i64("total_clicks", row.try_get("total_clicks").map_err(ser)?)?,
        wasted_clicks: u32_from_i64(
            "wasted_clicks",
            row.try_get("wasted_clicks").map_err(ser)?,
        )?,
        error_count: u32_from_i64("error_count", row.try_get("error_count").map_err(ser)?)?,
        captured_at: row.try_get("captured_at").map_err(ser)?,
    })
}

impl SqliteRepository {
    async fn insert_rows(&self, rows: &[RecordRow]) -> Result<(), StorageError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        for row in rows {
            sqlx::query(
                r"
                    INSERT INTO step_records (
                        session, task, page, status, duration_secs,
                        total_clicks, wasted_clicks, error_count, captured_at
                    )
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
            )
            .bind(row.session.as_deref())
            .bind(task_to_i64(row.task)?)
            .bind(i64::from(row.page))
            .bind(row.status.as_str())
            .bind(row.duration_secs)
            .bind(i64::from(row.total_clicks))
            .bind(i64::from(row.wasted_clicks))
            .bind(i64::from(row.error_count))
            .bind(row.captured_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl RecordRepository for SqliteRepository {
    async fn append_rows(&self, rows: &[RecordRow]) -> Result<(), StorageError> {
        self.insert_rows(rows).await
    }

    async fn list_rows(
        &self,
        session: Option<&str>,
        limit: u32,
    ) -> Result<Vec<RecordRow>, StorageError> {
        // Newest rows are picked first, then handed back oldest first.
        let mut sql = String::from(
            r"
                SELECT
                    session, task, page, status, duration_secs,
                    total_clicks, wasted_clicks, error_count, captured_at
                FROM (
                    SELECT * FROM step_records
            ",
        );
        let mut bind_index = 1;
        if session.is_some() {
            sql.push_str(" WHERE session = ?1");
            bind_index += 1;
        }
        sql.push_str(" ORDER BY id DESC LIMIT ?");
        sql.push_str(&bind_index.to_string());
        sql.push_str(") ORDER BY id ASC");

        let mut query = sqlx::query(&sql);
        if let Some(session) = session {
            query = query.bind(session);
        }
        query = query.bind(i64::from(limit));

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_record_row(&row)?);
        }
        Ok(out)
    }
}

