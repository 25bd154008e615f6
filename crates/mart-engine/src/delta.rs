//! Pure delta computation: given a prior and current [`ResolvedEntity`],
//! compute the signed [`ReportUpdate`]s that reconcile the aggregate
//! counters (spec.md §4.3 step 4-5). No I/O — kept separate from
//! `diff.rs` so the combinatorics here are unit-testable without a
//! database.
//!
//! Report-key bucketing for `MATCHED_COUNT`, the relationship match-type
//! counters, and the size/relation histograms are underspecified in the
//! prose beyond "counts entities contributing ... from the specified
//! (ordered) source pair" — the concrete policies below are this crate's
//! fixed interpretation (see `DESIGN.md`), chosen to be self-consistent so
//! emitted deltas always sum back to a direct base-table scan (spec.md §8
//! invariant 3), which is the only property the prose actually demands.

use std::collections::BTreeSet;

use mart_types::{
    BaseStatistic, EntityCore, MatchType, ReportCode, ReportKey, ReportStatistic, ReportUpdate,
    Relationship,
};

fn push_update(
    updates: &mut Vec<ReportUpdate>,
    code: ReportCode,
    stat: ReportStatistic,
    ds1: Option<&str>,
    ds2: Option<&str>,
    entity_id: i64,
    related_id: Option<i64>,
    entity_delta: i64,
    record_delta: i64,
    relation_delta: i64,
) {
    if entity_delta == 0 && record_delta == 0 && relation_delta == 0 {
        return;
    }
    let Ok(report_key) = ReportKey::new(
        code,
        stat,
        ds1.map(ToOwned::to_owned),
        ds2.map(ToOwned::to_owned),
    ) else {
        return;
    };
    updates.push(ReportUpdate {
        report_key,
        entity_id,
        related_id,
        entity_delta,
        record_delta,
        relation_delta,
    });
}

/// Buckets a record/relation count into a small fixed set of histogram
/// labels so `ESB`/`ERB` counters stay bounded regardless of how large a
/// resolved entity gets.
fn size_bucket(count: usize) -> &'static str {
    match count {
        0 => "0",
        1 => "1",
        2 => "2",
        3 => "3",
        4 => "4",
        _ => "5+",
    }
}

/// `DSS`/`CSS` deltas driven purely by `entity.records` membership: per
/// source entity-presence and record-count, unmatched/matched counts, and
/// the `ESB` size histogram.
pub fn record_deltas(entity_id: i64, prior: &EntityCore, current: &EntityCore) -> Vec<ReportUpdate> {
    let mut updates = Vec::new();

    let prior_summary = prior.source_summary();
    let current_summary = current.source_summary();
    let all_sources: BTreeSet<&String> = prior_summary.keys().chain(current_summary.keys()).collect();

    for source in all_sources {
        let before = prior_summary.get(source).copied().unwrap_or(0);
        let after = current_summary.get(source).copied().unwrap_or(0);
        if before == after {
            continue;
        }
        let entity_delta = i64::from(after > 0) - i64::from(before > 0);
        let record_delta = after as i64 - before as i64;

        push_update(
            &mut updates,
            ReportCode::Dss,
            ReportStatistic::new(BaseStatistic::RecordCount, None, None),
            Some(source),
            None,
            entity_id,
            None,
            0,
            record_delta,
            0,
        );
        push_update(
            &mut updates,
            ReportCode::Dss,
            ReportStatistic::new(BaseStatistic::EntityCount, None, None),
            Some(source),
            None,
            entity_id,
            None,
            entity_delta,
            0,
            0,
        );

        let was_unmatched = before == 1;
        let is_unmatched = after == 1;
        if was_unmatched != is_unmatched {
            push_update(
                &mut updates,
                ReportCode::Dss,
                ReportStatistic::new(BaseStatistic::UnmatchedCount, None, None),
                Some(source),
                None,
                entity_id,
                None,
                i64::from(is_unmatched) - i64::from(was_unmatched),
                0,
                0,
            );
        }

        let was_intra_matched = before >= 2;
        let is_intra_matched = after >= 2;
        if was_intra_matched != is_intra_matched {
            push_update(
                &mut updates,
                ReportCode::Css,
                ReportStatistic::new(BaseStatistic::MatchedCount, None, None),
                Some(source),
                Some(source),
                entity_id,
                None,
                i64::from(is_intra_matched) - i64::from(was_intra_matched),
                0,
                0,
            );
        }
    }

    for (ds1, ds2) in source_pairs(&prior_summary.keys().cloned().collect()) {
        if source_pairs(&current_summary.keys().cloned().collect()).contains(&(ds1.clone(), ds2.clone())) {
            continue;
        }
        push_update(
            &mut updates,
            ReportCode::Css,
            ReportStatistic::new(BaseStatistic::MatchedCount, None, None),
            Some(&ds1),
            Some(&ds2),
            entity_id,
            None,
            -1,
            0,
            0,
        );
    }
    for (ds1, ds2) in source_pairs(&current_summary.keys().cloned().collect()) {
        if source_pairs(&prior_summary.keys().cloned().collect()).contains(&(ds1.clone(), ds2.clone())) {
            continue;
        }
        push_update(
            &mut updates,
            ReportCode::Css,
            ReportStatistic::new(BaseStatistic::MatchedCount, None, None),
            Some(&ds1),
            Some(&ds2),
            entity_id,
            None,
            1,
            0,
            0,
        );
    }

    let prior_bucket = size_bucket(prior.records.len());
    let current_bucket = size_bucket(current.records.len());
    if prior_bucket != current_bucket || (prior.records.is_empty() != current.records.is_empty()) {
        if !prior.records.is_empty() {
            push_update(
                &mut updates,
                ReportCode::Esb,
                ReportStatistic::new(BaseStatistic::EntityCount, Some(prior_bucket), None),
                None,
                None,
                entity_id,
                None,
                -1,
                0,
                0,
            );
        }
        if !current.records.is_empty() {
            push_update(
                &mut updates,
                ReportCode::Esb,
                ReportStatistic::new(BaseStatistic::EntityCount, Some(current_bucket), None),
                None,
                None,
                entity_id,
                None,
                1,
                0,
                0,
            );
        }
    }

    updates
}

/// Every unordered pair of distinct sources present, plus same-source pairs
/// for sources appearing twice or more — the population `MATCHED_COUNT`
/// ranges over.
fn source_pairs(sources: &BTreeSet<String>) -> BTreeSet<(String, String)> {
    let mut pairs = BTreeSet::new();
    let ordered: Vec<&String> = sources.iter().collect();
    for (i, a) in ordered.iter().enumerate() {
        for b in &ordered[i + 1..] {
            pairs.insert(((*a).clone(), (*b).clone()));
        }
    }
    pairs
}

/// The `{(mk,p), (mk,ø), (ø,p), (ø,ø)}` qualifier iteration from spec.md
/// §4.3's edge cases, applied to one relationship's own `(matchKey,
/// principle)` pair.
fn match_pair_qualifiers(match_key: &str, principle: &str) -> [(Option<&str>, Option<&str>); 4] {
    let mk = (!match_key.is_empty()).then_some(match_key);
    let p = (!principle.is_empty()).then_some(principle);
    [(mk, p), (mk, None), (None, p), (None, None)]
}

fn base_statistic_for(match_type: MatchType) -> BaseStatistic {
    match match_type {
        MatchType::AmbiguousMatch => BaseStatistic::AmbiguousMatchCount,
        MatchType::PossibleMatch => BaseStatistic::PossibleMatchCount,
        MatchType::PossibleRelation => BaseStatistic::PossibleRelationCount,
        MatchType::DisclosedRelation => BaseStatistic::DisclosedRelationCount,
    }
}

/// The source pair a relationship counter is addressed under: each side's
/// lexicographically-first contributing source, a stable simplification of
/// "the specified (ordered) source pair" down to one representative pair
/// per relationship rather than the full cross product.
fn representative_sources(core: &EntityCore) -> Option<String> {
    core.contributing_sources().into_iter().next()
}

/// `CSS:<MATCH_TYPE>_COUNT` deltas for one relationship transitioning
/// in (`sign = 1`), out (`sign = -1`), or changing kind/key (emit both).
pub fn relationship_deltas(
    relationship: &Relationship,
    lo_core: &EntityCore,
    hi_core: &EntityCore,
    sign: i64,
) -> Vec<ReportUpdate> {
    let mut updates = Vec::new();
    let Some(ds1) = representative_sources(lo_core) else {
        return updates;
    };
    let Some(ds2) = representative_sources(hi_core) else {
        return updates;
    };
    let base = base_statistic_for(relationship.match_type);

    for (mk, p) in match_pair_qualifiers(&relationship.match_key, &relationship.principle) {
        push_update(
            &mut updates,
            ReportCode::Css,
            ReportStatistic::new(base, p, mk),
            Some(&ds1),
            Some(&ds2),
            relationship.lo,
            Some(relationship.hi),
            0,
            0,
            sign,
        );
    }

    push_update(
        &mut updates,
        ReportCode::Erb,
        ReportStatistic::new(BaseStatistic::EntityCount, None, None),
        None,
        None,
        relationship.lo,
        Some(relationship.hi),
        0,
        0,
        sign,
    );

    updates
}

#[cfg(test)]
mod tests {
    use super::*;
    use mart_types::{Record, RecordKey};

    fn core(id: i64, sources: &[&str]) -> EntityCore {
        EntityCore::new(
            id,
            None,
            sources
                .iter()
                .enumerate()
                .map(|(i, source)| Record::new(RecordKey::new((*source).to_owned(), i.to_string()), None, None))
                .collect(),
        )
    }

    #[test]
    fn single_record_entity_increments_unmatched_count() {
        let prior = core(1, &[]);
        let current = core(1, &["FOO"]);
        let updates = record_deltas(1, &prior, &current);

        let unmatched = updates
            .iter()
            .find(|u| u.report_key.statistic.base == BaseStatistic::UnmatchedCount)
            .expect("should emit an UNMATCHED_COUNT delta");
        assert_eq!(unmatched.entity_delta, 1);
        assert_eq!(unmatched.report_key.data_source_1.as_deref(), Some("FOO"));
    }

    #[test]
    fn second_record_from_new_source_clears_unmatched_and_sets_matched() {
        let prior = core(1, &["FOO"]);
        let current = core(1, &["FOO", "BAR"]);
        let updates = record_deltas(1, &prior, &current);

        let unmatched = updates
            .iter()
            .find(|u| u.report_key.statistic.base == BaseStatistic::UnmatchedCount && u.report_key.data_source_1.as_deref() == Some("FOO"))
            .expect("FOO should lose its unmatched contribution");
        assert_eq!(unmatched.entity_delta, -1);

        let matched = updates
            .iter()
            .find(|u| {
                u.report_key.statistic.base == BaseStatistic::MatchedCount
                    && u.report_key.data_source_1.as_deref() == Some("BAR")
                    && u.report_key.data_source_2.as_deref() == Some("FOO")
            })
            .expect("cross-source MATCHED_COUNT should be emitted");
        assert_eq!(matched.entity_delta, 1);
    }

    #[test]
    fn same_source_duplicate_sets_same_source_matched_count() {
        let prior = core(1, &["FOO"]);
        let current = core(1, &["FOO", "FOO"]);
        let updates = record_deltas(1, &prior, &current);

        let matched = updates
            .iter()
            .find(|u| {
                u.report_key.statistic.base == BaseStatistic::MatchedCount
                    && u.report_key.data_source_1.as_deref() == Some("FOO")
                    && u.report_key.data_source_2.as_deref() == Some("FOO")
            })
            .expect("same-source MATCHED_COUNT should be emitted");
        assert_eq!(matched.entity_delta, 1);
    }

    #[test]
    fn unchanged_state_emits_no_updates() {
        let entity = core(1, &["FOO", "BAR"]);
        assert!(record_deltas(1, &entity, &entity).is_empty());
    }

    #[test]
    fn relationship_deltas_use_qualifier_iteration() {
        let lo = core(1, &["FOO"]);
        let hi = core(2, &["BAR"]);
        let relationship = Relationship {
            lo: 1,
            hi: 2,
            match_level: 0,
            match_type: MatchType::PossibleRelation,
            match_key: "PHONE".to_owned(),
            principle: "SF1".to_owned(),
            source_summary_lo: lo.source_summary(),
            source_summary_hi: hi.source_summary(),
        };

        let updates = relationship_deltas(&relationship, &lo, &hi, 1);
        let css_updates: Vec<_> = updates
            .iter()
            .filter(|u| u.report_key.code == ReportCode::Css)
            .collect();
        // (mk,p), (mk,None), (None,p), (None,None)
        assert_eq!(css_updates.len(), 4);
        assert!(css_updates.iter().all(|u| u.relation_delta == 1));
    }
}
