//! The dead-letter table a poison message is moved to once it has failed
//! refresh more times than the configured cap (spec.md §4.2).

use chrono::Utc;
use error_stack::{Report, ResultExt as _};
use mart_store::pool::StorePool;
use sqlx::Row as _;

use crate::error::QueueError;

#[derive(Debug, Clone)]
pub struct DeadLetterRow {
    pub id: i64,
    pub payload: String,
    pub first_failed_at: String,
    pub attempt_count: i64,
    pub last_error_chain: String,
}

#[derive(Debug, Clone)]
pub struct DeadLetterStore<P> {
    pool: P,
}

impl<P: StorePool> DeadLetterStore<P> {
    #[must_use]
    pub fn new(pool: P) -> Self {
        Self { pool }
    }

    /// Records a poison message with the full exception chain that caused
    /// it to be abandoned (spec.md §4.2: "moved to a dead-letter table with
    /// the exception chain recorded").
    pub async fn record(
        &self,
        payload: &str,
        attempt_count: i64,
        error_chain: &str,
    ) -> Result<i64, Report<QueueError>> {
        let mut conn = self.pool.acquire().await.change_context(QueueError)?;
        let now = Utc::now().to_rfc3339();

        let row = sqlx::query(
            "INSERT INTO dead_letter (payload, first_failed_at, attempt_count, last_error_chain) \
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(payload)
        .bind(&now)
        .bind(attempt_count)
        .bind(error_chain)
        .fetch_one(&mut *conn)
        .await
        .change_context(QueueError)
        .attach_printable("recording a dead-lettered event")?;

        Ok(row.get::<i64, _>("id"))
    }

    pub async fn list(&self) -> Result<Vec<DeadLetterRow>, Report<QueueError>> {
        let mut conn = self.pool.acquire().await.change_context(QueueError)?;

        let rows = sqlx::query(
            "SELECT id, payload, first_failed_at, attempt_count, last_error_chain \
             FROM dead_letter ORDER BY id ASC",
        )
        .fetch_all(&mut *conn)
        .await
        .change_context(QueueError)
        .attach_printable("listing dead-lettered events")?;

        Ok(rows
            .into_iter()
            .map(|row| DeadLetterRow {
                id: row.get::<i64, _>("id"),
                payload: row.get::<String, _>("payload"),
                first_failed_at: row.get::<String, _>("first_failed_at"),
                attempt_count: row.get::<i64, _>("attempt_count"),
                last_error_chain: row.get::<String, _>("last_error_chain"),
            })
            .collect())
    }
}
