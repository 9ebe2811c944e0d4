use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the versioned migrations for the record journal.
///
/// Version 1 creates `step_records` and its session index.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS step_records (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    session TEXT,
                    task INTEGER NOT NULL CHECK (task >= 1),
                    page INTEGER NOT NULL CHECK (page >= 1),
                    status TEXT NOT NULL CHECK (status IN ('SUCCESS', 'FAILURE')),
                    duration_secs REAL NOT NULL CHECK (duration_secs >= 0),
                    total_clicks INTEGER NOT NULL CHECK (total_clicks >= 0),
                    wasted_clicks INTEGER NOT NULL CHECK (wasted_clicks >= 0),
                    error_count INTEGER NOT NULL CHECK (error_count >= 0),
                    captured_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_step_records_session
                    ON step_records (session, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied journal migration");
    }

    Ok(())
}
