//! The pagination engine (spec.md §4.5): given a report key and a bound,
//! returns one stable window of entity ids or `(entityId, relatedId)` pairs
//! out of the `report_detail` membership set `mart-engine::journal`
//! maintains. No cursor is stored server-side — bound + direction fully
//! identify the next page, which is what lets `afterPageCount`/
//! `beforePageCount` cheaply power a "page N of M" UI without
//! materializing the whole enumeration.

use error_stack::{Report, ResultExt as _};
use mart_store::pool::StorePool;
use mart_types::{ReportKey, match_keys_equivalent, reverse_match_key};
use rand::seq::SliceRandom as _;
use sqlx::Row as _;

use crate::bound::{BoundType, EntityBound, RelationBound};
use crate::error::PaginationError;
use crate::page::Page;

/// `pageSize` used when neither `pageSize` nor `sampleSize` is given.
pub const DEFAULT_PAGE_SIZE: i64 = 100;
/// `pageSize = SAMPLE_SIZE_MULTIPLIER * sampleSize` when only `sampleSize`
/// is given.
pub const SAMPLE_SIZE_MULTIPLIER: i64 = 10;

pub struct PaginationEngine<P> {
    pool: P,
}

fn resolve_sizes(page_size: Option<i64>, sample_size: Option<i64>) -> Result<(i64, Option<i64>), PaginationError> {
    if let Some(s) = sample_size {
        if s < 0 {
            return Err(PaginationError::MalformedInput("sampleSize is negative".to_owned()));
        }
    }
    if let Some(p) = page_size {
        if p < 0 {
            return Err(PaginationError::MalformedInput("pageSize is negative".to_owned()));
        }
    }
    let resolved_page_size = match (page_size, sample_size) {
        (Some(p), _) => p,
        (None, Some(s)) => SAMPLE_SIZE_MULTIPLIER * s,
        (None, None) => DEFAULT_PAGE_SIZE,
    };
    if let Some(s) = sample_size {
        if s >= resolved_page_size {
            return Err(PaginationError::MalformedInput(
                "sampleSize must be smaller than pageSize".to_owned(),
            ));
        }
    }
    Ok((resolved_page_size, sample_size))
}

/// Builds a page out of the full, ascending-sorted partition plus a
/// predicate that tells which elements the bound admits. `admits` must be
/// monotonic over `universe`'s order: false-then-true for a lower bound,
/// true-then-false for an upper one — which holds for every [`EntityBound`]
/// / [`RelationBound`] comparison.
fn windowed<T: Copy>(
    universe: &[T],
    bound_type: BoundType,
    admits: impl Fn(T) -> bool,
    page_size: i64,
) -> (Vec<T>, i64, i64) {
    let page_size = page_size.max(0) as usize;
    let total = universe.len();
    if bound_type.is_lower() {
        let start = universe.partition_point(|&v| !admits(v));
        let end = (start + page_size).min(total);
        let window = universe[start..end].to_vec();
        (window, start as i64, (total - end) as i64)
    } else {
        let end = universe.partition_point(|&v| admits(v));
        let start = end.saturating_sub(page_size);
        let window = universe[start..end].to_vec();
        (window, start as i64, (total - end) as i64)
    }
}

fn finish_page<T: Copy>(
    universe: Vec<T>,
    window: Vec<T>,
    before: i64,
    after: i64,
    bound_text: String,
    bound_type: BoundType,
    page_size: i64,
    sample_size: Option<i64>,
) -> Page<T> {
    let total_count = universe.len() as i64;
    let overall_min = universe.first().copied();
    let overall_max = universe.last().copied();

    let items = if let Some(sample_size) = sample_size {
        let mut indices: Vec<usize> = (0..window.len()).collect();
        indices.shuffle(&mut rand::thread_rng());
        indices.truncate(sample_size as usize);
        indices.sort_unstable();
        indices.into_iter().map(|i| window[i]).collect()
    } else {
        window
    };

    Page {
        bound: bound_text,
        bound_type,
        page_size,
        sample_size,
        page_min: items.first().copied(),
        page_max: items.last().copied(),
        overall_min: if sample_size.is_some() { None } else { overall_min },
        overall_max: if sample_size.is_some() { None } else { overall_max },
        before_page_count: before,
        after_page_count: after,
        total_count,
        items,
    }
}

impl<P: StorePool> PaginationEngine<P> {
    #[must_use]
    pub const fn new(pool: P) -> Self {
        Self { pool }
    }

    /// Report keys to scan for `report_key`: itself, plus its token-sort
    /// reversed match-key variant when one is present (spec.md §9's decided
    /// open question — a caller filtering by `"PHONE_NUMBER+ADDRESS"` must
    /// find rows stored under `"ADDRESS+PHONE_NUMBER"`).
    fn scan_keys(report_key: &ReportKey) -> Vec<String> {
        let mut keys = vec![report_key.format()];
        if let Some(match_key) = &report_key.statistic.match_key {
            let reversed = reverse_match_key(match_key);
            if !match_keys_equivalent(match_key, &reversed) || reversed != *match_key {
                let mut reversed_key = report_key.clone();
                reversed_key.statistic.match_key = Some(reversed);
                keys.push(reversed_key.format());
            }
        }
        keys
    }

    async fn entity_partition(&self, report_key: &ReportKey) -> Result<Vec<i64>, Report<PaginationError>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .change_context(PaginationError::TransportTransient("acquiring connection".to_owned()))?;
        let mut ids = std::collections::BTreeSet::new();
        for key in Self::scan_keys(report_key) {
            let rows = sqlx::query(
                "SELECT entity_id FROM report_detail WHERE report_key = ? AND related_id IS NULL",
            )
            .bind(&key)
            .fetch_all(&mut *conn)
            .await
            .change_context(PaginationError::TransportTransient("reading entity partition".to_owned()))?;
            ids.extend(rows.into_iter().map(|row| row.get::<i64, _>("entity_id")));
        }
        Ok(ids.into_iter().collect())
    }

    async fn relation_partition(&self, report_key: &ReportKey) -> Result<Vec<(i64, i64)>, Report<PaginationError>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .change_context(PaginationError::TransportTransient("acquiring connection".to_owned()))?;
        let mut pairs = std::collections::BTreeSet::new();
        for key in Self::scan_keys(report_key) {
            let rows = sqlx::query(
                "SELECT entity_id, related_id FROM report_detail \
                 WHERE report_key = ? AND related_id IS NOT NULL",
            )
            .bind(&key)
            .fetch_all(&mut *conn)
            .await
            .change_context(PaginationError::TransportTransient("reading relation partition".to_owned()))?;
            pairs.extend(
                rows.into_iter()
                    .map(|row| (row.get::<i64, _>("entity_id"), row.get::<i64, _>("related_id"))),
            );
        }
        Ok(pairs.into_iter().collect())
    }

    /// Pages the set of entity ids contributing to `report_key`.
    ///
    /// # Errors
    /// [`PaginationError::MalformedInput`] on a bad bound or page/sample
    /// size; [`PaginationError::TransportTransient`] on a database failure.
    pub async fn entity_page(
        &self,
        report_key: &ReportKey,
        bound_text: Option<&str>,
        bound_type: BoundType,
        page_size: Option<i64>,
        sample_size: Option<i64>,
    ) -> Result<Page<i64>, Report<PaginationError>> {
        let bound = EntityBound::parse(bound_text, bound_type).map_err(Report::new)?;
        let (page_size, sample_size) = resolve_sizes(page_size, sample_size).map_err(Report::new)?;

        let universe = self.entity_partition(report_key).await?;
        let (window, before, after) = windowed(&universe, bound_type, |id| bound.admits(id, bound_type), page_size);
        let resolved_bound_text = bound_text.map_or_else(|| "0".to_owned(), ToOwned::to_owned);
        Ok(finish_page(
            universe,
            window,
            before,
            after,
            resolved_bound_text,
            bound_type,
            page_size,
            sample_size,
        ))
    }

    /// Pages the set of `(entityId, relatedId)` pairs contributing to
    /// `report_key`.
    ///
    /// # Errors
    /// [`PaginationError::MalformedInput`] on a bad bound or page/sample
    /// size; [`PaginationError::TransportTransient`] on a database failure.
    pub async fn relation_page(
        &self,
        report_key: &ReportKey,
        bound_text: Option<&str>,
        bound_type: BoundType,
        page_size: Option<i64>,
        sample_size: Option<i64>,
    ) -> Result<Page<(i64, i64)>, Report<PaginationError>> {
        let bound = RelationBound::parse(bound_text, bound_type).map_err(Report::new)?;
        let (page_size, sample_size) = resolve_sizes(page_size, sample_size).map_err(Report::new)?;

        let universe = self.relation_partition(report_key).await?;
        let (window, before, after) = windowed(&universe, bound_type, |pair| bound.admits(pair, bound_type), page_size);
        let resolved_bound_text = bound_text.map_or_else(|| "0:0".to_owned(), ToOwned::to_owned);
        Ok(finish_page(
            universe,
            window,
            before,
            after,
            resolved_bound_text,
            bound_type,
            page_size,
            sample_size,
        ))
    }
}
