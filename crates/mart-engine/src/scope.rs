//! Data-source scope control (spec.md §4.6): which data sources a report
//! must materialize a (possibly zero) counter row for, independent of
//! whether any entity currently contributes to them.

use std::collections::BTreeSet;

use error_stack::{Report, ResultExt as _};
use mart_store::pool::StorePool;
use mart_types::{BaseStatistic, ReportCode, ReportKey, ReportStatistic};
use sqlx::Row as _;

use crate::error::MartError;

/// The per-source `DSS` statistics a zero-row must be materialized for
/// (spec.md §4.6); `MATCHED_COUNT` is addressed by a source *pair*, not a
/// single source, so it is out of scope for this materialization.
const ZERO_ROW_STATISTICS: [BaseStatistic; 3] = [
    BaseStatistic::EntityCount,
    BaseStatistic::RecordCount,
    BaseStatistic::UnmatchedCount,
];

/// The well-known template defaults excluded by [`SourceScopeMode::AllButDefault`].
pub const TEMPLATE_DEFAULT_SOURCES: [&str; 2] = ["TEST", "SEARCH"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceScopeMode {
    /// Only data sources with at least one loaded record.
    Loaded,
    /// Every configured source minus [`TEMPLATE_DEFAULT_SOURCES`].
    AllButDefault,
    /// Every configured source, defaults included.
    AllWithDefault,
}

/// Resolves a scope mode plus an optional extra set of source names (spec.md
/// §4.6: "Callers may additionally supply an extra set of source names
/// whose zero rows must be materialized.") against the currently configured
/// and currently loaded source sets.
#[derive(Debug, Clone)]
pub struct SourceScope<P> {
    pool: P,
}

impl<P: StorePool> SourceScope<P> {
    #[must_use]
    pub fn new(pool: P) -> Self {
        Self { pool }
    }

    /// Sources with at least one record currently loaded, from the `record`
    /// table directly.
    async fn loaded_sources(&self) -> Result<BTreeSet<String>, Report<MartError>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .change_context(MartError::TransportTransient("acquiring connection for scope resolution".to_owned()))?;
        let rows = sqlx::query("SELECT DISTINCT data_source FROM record")
            .fetch_all(&mut *conn)
            .await
            .change_context(MartError::TransportTransient("reading loaded sources".to_owned()))?;
        Ok(rows.into_iter().map(|row| row.get::<String, _>("data_source")).collect())
    }

    /// Resolves which sources must have a materialized (possibly zero) row.
    /// `configured_sources` is the operator-supplied list of every source
    /// known to the system, independent of what is currently loaded.
    pub async fn resolve(
        &self,
        mode: SourceScopeMode,
        configured_sources: &BTreeSet<String>,
        extra: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, Report<MartError>> {
        let mut sources = match mode {
            SourceScopeMode::Loaded => self.loaded_sources().await?,
            SourceScopeMode::AllButDefault => configured_sources
                .iter()
                .filter(|s| !TEMPLATE_DEFAULT_SOURCES.contains(&s.as_str()))
                .cloned()
                .collect(),
            SourceScopeMode::AllWithDefault => configured_sources.clone(),
        };
        sources.extend(extra.iter().cloned());
        Ok(sources)
    }

    /// Resolves the scope, then inserts a zero `report_counter` row for
    /// every `(DSS statistic, source)` pair that has none yet, so a
    /// configured-but-empty source reports zero rather than null (spec.md
    /// §4.6). Existing counter rows are left untouched (`DO NOTHING`).
    /// Returns the number of rows actually materialized.
    pub async fn materialize(
        &self,
        mode: SourceScopeMode,
        configured_sources: &BTreeSet<String>,
        extra: &BTreeSet<String>,
    ) -> Result<u64, Report<MartError>> {
        let sources = self.resolve(mode, configured_sources, extra).await?;

        let mut tx = self
            .pool
            .begin()
            .await
            .change_context(MartError::TransportTransient("beginning zero-row materialization".to_owned()))?;

        let mut materialized = 0u64;
        for source in &sources {
            for base in ZERO_ROW_STATISTICS {
                let Ok(report_key) =
                    ReportKey::new(ReportCode::Dss, ReportStatistic::new(base, None, None), Some(source.clone()), None)
                else {
                    continue;
                };

                let result = sqlx::query(
                    "INSERT INTO report_counter (report_key, entity_count, record_count, relation_count) \
                     VALUES (?, 0, 0, 0) ON CONFLICT(report_key) DO NOTHING",
                )
                .bind(report_key.format())
                .execute(&mut *tx)
                .await
                .change_context(MartError::TransportTransient("materializing a zero counter row".to_owned()))?;
                materialized += result.rows_affected();
            }
        }

        tx.commit()
            .await
            .change_context(MartError::TransportTransient("committing zero-row materialization".to_owned()))?;

        Ok(materialized)
    }
}
