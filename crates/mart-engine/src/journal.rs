//! The report-update journal: append-only, monotonic-sequence rows folded
//! into `report_counter` (spec.md §4.4). Folding is a straight sum, so
//! replaying any suffix after a crash yields the same counters — the
//! journal's own idempotence guarantee, independent of the diff engine's.

use std::collections::HashMap;

use error_stack::{Report, ResultExt as _};
use mart_store::pool::StorePool;
use mart_types::{ReportKey, ReportUpdate};
use sqlx::QueryBuilder;
use sqlx::Row as _;

use crate::error::MartError;

/// Appends updates in insertion order within the caller's transaction — the
/// same transaction `diff::refresh` uses for its mutations, so a crash
/// between the two can never happen. Also maintains `report_detail`, the
/// membership set the pagination engine enumerates: a positive
/// `entity_delta` marks `(report_key, entity_id, related_id)` as
/// contributing, a negative one retracts it.
pub(crate) async fn append(
    tx: &mut sqlx::Transaction<'_, sqlx::Any>,
    updates: &[ReportUpdate],
    _now: &str,
) -> Result<(), Report<MartError>> {
    for update in updates {
        let report_key = update.report_key.format();
        sqlx::query(
            "INSERT INTO report_update \
             (report_key, entity_id, related_id, entity_delta, record_delta, relation_delta) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&report_key)
        .bind(update.entity_id)
        .bind(update.related_id)
        .bind(update.entity_delta)
        .bind(update.record_delta)
        .bind(update.relation_delta)
        .execute(&mut **tx)
        .await
        .change_context(MartError::TransportTransient("appending report-update journal row".to_owned()))?;

        if update.entity_delta > 0 {
            sqlx::query(
                "INSERT INTO report_detail (report_key, entity_id, related_id) VALUES (?, ?, ?) \
                 ON CONFLICT(report_key, entity_id, related_id) DO NOTHING",
            )
            .bind(&report_key)
            .bind(update.entity_id)
            .bind(update.related_id)
            .execute(&mut **tx)
            .await
            .change_context(MartError::TransportTransient("recording report-detail membership".to_owned()))?;
        } else if update.entity_delta < 0 {
            let delete = if update.related_id.is_some() {
                sqlx::query(
                    "DELETE FROM report_detail WHERE report_key = ? AND entity_id = ? AND related_id = ?",
                )
                .bind(&report_key)
                .bind(update.entity_id)
                .bind(update.related_id)
            } else {
                sqlx::query(
                    "DELETE FROM report_detail WHERE report_key = ? AND entity_id = ? AND related_id IS NULL",
                )
                .bind(&report_key)
                .bind(update.entity_id)
            };
            delete
                .execute(&mut **tx)
                .await
                .change_context(MartError::TransportTransient("retracting report-detail membership".to_owned()))?;
        }
    }
    Ok(())
}

#[derive(Default, Clone, Copy)]
struct CounterDelta {
    entity: i64,
    record: i64,
    relation: i64,
}

/// Folds a contiguous prefix of up to `limit` journal rows into
/// `report_counter`, then deletes the folded rows, all in one transaction.
/// Ordering only matters for crash-recovery observability (spec.md §4.4) —
/// the fold itself is a commutative, associative sum.
pub async fn apply_batch<P: StorePool>(pool: &P, limit: i64) -> Result<u64, Report<MartError>> {
    let mut tx = pool
        .begin()
        .await
        .change_context(MartError::TransportTransient("beginning journal fold transaction".to_owned()))?;

    let rows = sqlx::query(
        "SELECT seq, report_key, entity_delta, record_delta, relation_delta \
         FROM report_update ORDER BY seq ASC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(&mut *tx)
    .await
    .change_context(MartError::TransportTransient("reading journal prefix".to_owned()))?;

    if rows.is_empty() {
        tx.commit().await.change_context(MartError::TransportTransient("committing empty fold".to_owned()))?;
        return Ok(0);
    }

    let mut sums: HashMap<String, CounterDelta> = HashMap::new();
    let mut seqs: Vec<i64> = Vec::with_capacity(rows.len());
    for row in &rows {
        let report_key: String = row.get("report_key");
        let entry = sums.entry(report_key).or_default();
        entry.entity += row.get::<i64, _>("entity_delta");
        entry.record += row.get::<i64, _>("record_delta");
        entry.relation += row.get::<i64, _>("relation_delta");
        seqs.push(row.get("seq"));
    }

    for (report_key, delta) in &sums {
        ReportKey::parse(report_key)
            .change_context(MartError::Logic("journal contains an unparseable report key".to_owned()))?;

        sqlx::query(
            "INSERT INTO report_counter (report_key, entity_count, record_count, relation_count) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(report_key) DO UPDATE SET \
               entity_count = entity_count + excluded.entity_count, \
               record_count = record_count + excluded.record_count, \
               relation_count = relation_count + excluded.relation_count",
        )
        .bind(report_key)
        .bind(delta.entity)
        .bind(delta.record)
        .bind(delta.relation)
        .execute(&mut *tx)
        .await
        .change_context(MartError::TransportTransient("folding into report_counter".to_owned()))?;
    }

    let mut delete = QueryBuilder::new("DELETE FROM report_update WHERE seq IN (");
    let mut separated = delete.separated(", ");
    for seq in &seqs {
        separated.push_bind(*seq);
    }
    separated.push_unseparated(")");
    delete
        .build()
        .execute(&mut *tx)
        .await
        .change_context(MartError::TransportTransient("deleting folded journal rows".to_owned()))?;

    tx.commit()
        .await
        .change_context(MartError::TransportTransient("committing journal fold".to_owned()))?;

    Ok(seqs.len() as u64)
}
