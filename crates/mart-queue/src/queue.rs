//! The durable pending-event queue (spec.md §4.1).
//!
//! Grounded on the lease-batch `UPDATE ... RETURNING` pattern from the
//! pack's webhook dispatcher store: reclaim expired leases defensively,
//! then atomically grab and lease a bounded batch of eligible rows in one
//! statement, then fetch their payloads inside the same transaction.

use chrono::{Duration, Utc};
use error_stack::{Report, ResultExt as _};
use mart_store::pool::StorePool;
use sqlx::Row as _;
use uuid::Uuid;

use crate::error::QueueError;

/// A row handed to a worker by [`EventQueue::lease_batch`]. `lease_id` must
/// be echoed back to [`EventQueue::ack`] — an ack with a stale or mismatched
/// lease id is a no-op, never an error, so a worker that raced past its
/// lease's expiry simply fails to delete the row and it gets redelivered.
#[derive(Debug, Clone)]
pub struct LeasedEvent {
    pub id: i64,
    pub payload: String,
    pub lease_id: String,
}

/// Queue operations layered over any [`StorePool`]. Holds no connection of
/// its own — every call acquires (or is handed) one from the pool, so the
/// same `EventQueue` works against either dialect adapter.
#[derive(Debug, Clone)]
pub struct EventQueue<P> {
    pool: P,
}

impl<P: StorePool> EventQueue<P> {
    #[must_use]
    pub fn new(pool: P) -> Self {
        Self { pool }
    }

    /// Appends a payload durably. Returns the assigned monotonic id.
    pub async fn enqueue(&self, payload: &str) -> Result<i64, Report<QueueError>> {
        let mut conn = self.pool.acquire().await.change_context(QueueError)?;
        let now = Utc::now().to_rfc3339();

        let row = sqlx::query(
            "INSERT INTO pending_event (payload, created_at, modified_at) \
             VALUES (?, ?, ?) RETURNING id",
        )
        .bind(payload)
        .bind(&now)
        .bind(&now)
        .fetch_one(&mut *conn)
        .await
        .change_context(QueueError)
        .attach_printable("enqueueing a pending event")?;

        Ok(row.get::<i64, _>("id"))
    }

    /// Reclaims leases whose `lease_expires_at` has passed, clearing them so
    /// the rows become eligible for [`Self::lease_batch`] again. Called both
    /// defensively at the start of every lease attempt and on its own
    /// schedule by a background sweeper (spec.md §4.1: "A background
    /// sweeper reclaims expired leases by clearing them.").
    pub async fn reclaim_expired_leases(&self) -> Result<u64, Report<QueueError>> {
        let mut conn = self.pool.acquire().await.change_context(QueueError)?;
        let now = Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE pending_event SET lease_id = NULL, lease_expires_at = NULL, modified_at = ? \
             WHERE lease_expires_at IS NOT NULL AND lease_expires_at <= ?",
        )
        .bind(&now)
        .bind(&now)
        .execute(&mut *conn)
        .await
        .change_context(QueueError)
        .attach_printable("reclaiming expired leases")?;

        Ok(result.rows_affected())
    }

    /// Atomically marks up to `limit` currently-unleased (or expired-lease)
    /// rows with a fresh lease and returns them, ordered by id so redelivery
    /// preserves arrival order as a tie-break.
    pub async fn lease_batch(
        &self,
        limit: i64,
        lease_duration: Duration,
    ) -> Result<Vec<LeasedEvent>, Report<QueueError>> {
        self.reclaim_expired_leases().await?;

        let mut tx = self.pool.begin().await.change_context(QueueError)?;
        let now = Utc::now();
        let lease_id = Uuid::new_v4().to_string();
        let lease_expires_at = (now + lease_duration).to_rfc3339();
        let now_str = now.to_rfc3339();

        let rows = sqlx::query(
            "WITH eligible AS ( \
                SELECT id FROM pending_event \
                WHERE lease_id IS NULL \
                ORDER BY id ASC \
                LIMIT ? \
            ) \
            UPDATE pending_event \
            SET lease_id = ?, lease_expires_at = ?, modified_at = ? \
            WHERE id IN (SELECT id FROM eligible) \
            RETURNING id, payload",
        )
        .bind(limit)
        .bind(&lease_id)
        .bind(&lease_expires_at)
        .bind(&now_str)
        .fetch_all(&mut *tx)
        .await
        .change_context(QueueError)
        .attach_printable("leasing a batch of pending events")?;

        tx.commit().await.change_context(QueueError)?;

        Ok(rows
            .into_iter()
            .map(|row| LeasedEvent {
                id: row.get::<i64, _>("id"),
                payload: row.get::<String, _>("payload"),
                lease_id: lease_id.clone(),
            })
            .collect())
    }

    /// Deletes the row iff its current lease still matches. Returns whether
    /// the delete happened — a `false` result (mismatched or already-expired
    /// lease) is not an error, per spec.md §4.1's "mismatched or expired
    /// leases are no-ops."
    pub async fn ack(&self, id: i64, lease_id: &str) -> Result<bool, Report<QueueError>> {
        let mut conn = self.pool.acquire().await.change_context(QueueError)?;

        let result = sqlx::query("DELETE FROM pending_event WHERE id = ? AND lease_id = ?")
            .bind(id)
            .bind(lease_id)
            .execute(&mut *conn)
            .await
            .change_context(QueueError)
            .attach_printable_lazy(|| format!("acking pending event {id}"))?;

        Ok(result.rows_affected() > 0)
    }
}
