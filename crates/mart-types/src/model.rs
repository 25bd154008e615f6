//! The core value objects replicated into the mart: records, entities,
//! entity-to-entity relationships, and the report-update deltas the diff
//! engine emits for them.
//!
//! The source domain models these with deep inheritance
//! (`Entity -> RelatedEntity`, `Entity -> ResolvedEntity`). Rust has no
//! class inheritance, so the shared fields live in [`EntityCore`] and the
//! two specializations hold an `EntityCore` plus their extra fields instead
//! of extending it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// `(dataSource, recordId)`, ordered lexicographically by data source first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey {
    pub data_source: String,
    pub record_id: String,
}

impl RecordKey {
    #[must_use]
    pub fn new(data_source: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            record_id: record_id.into(),
        }
    }
}

/// Trims a string and returns `None` if the result is empty.
///
/// `matchKey` and `principle` are normalized this way wherever they appear
/// on the wire or in storage.
#[must_use]
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|trimmed| !trimmed.is_empty())
        .map(ToOwned::to_owned)
}

/// A single source record contributing to an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    #[serde(flatten)]
    pub key: RecordKey,
    pub match_key: Option<String>,
    pub principle: Option<String>,
}

impl Record {
    #[must_use]
    pub fn new(
        key: RecordKey,
        match_key: Option<&str>,
        principle: Option<&str>,
    ) -> Self {
        Self {
            key,
            match_key: normalize_optional(match_key),
            principle: normalize_optional(principle),
        }
    }
}

/// The fields shared by a plain `Entity`, a `RelatedEntity`, and a
/// `ResolvedEntity`.
///
/// `source_summary` is deliberately not a stored field: it is always
/// recomputed from `records` so the invariant `sourceSummary[d] = |{r :
/// r.dataSource = d}|` cannot drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityCore {
    pub id: i64,
    pub name: Option<String>,
    pub records: BTreeMap<RecordKey, Record>,
}

impl EntityCore {
    #[must_use]
    pub fn new(id: i64, name: Option<String>, records: Vec<Record>) -> Self {
        Self {
            id,
            name,
            records: records.into_iter().map(|r| (r.key.clone(), r)).collect(),
        }
    }

    /// Per-data-source record counts, derived from `records`.
    #[must_use]
    pub fn source_summary(&self) -> BTreeMap<String, usize> {
        let mut summary = BTreeMap::new();
        for key in self.records.keys() {
            *summary.entry(key.data_source.clone()).or_insert(0) += 1;
        }
        summary
    }

    /// The set of data sources this entity contributes to at all.
    #[must_use]
    pub fn contributing_sources(&self) -> BTreeSet<String> {
        self.records.keys().map(|k| k.data_source.clone()).collect()
    }
}

/// The kind of link between two entities, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    AmbiguousMatch,
    PossibleMatch,
    PossibleRelation,
    DisclosedRelation,
}

impl MatchType {
    /// Detects the match type from the ER engine's flag/level cascade
    /// (spec §3): `isAmbiguous` wins, then `isDisclosed`, then
    /// `matchLevel == 2`, else `PossibleRelation`.
    #[must_use]
    pub fn detect(is_ambiguous: bool, is_disclosed: bool, match_level: i32) -> Self {
        if is_ambiguous {
            Self::AmbiguousMatch
        } else if is_disclosed {
            Self::DisclosedRelation
        } else if match_level == 2 {
            Self::PossibleMatch
        } else {
            Self::PossibleRelation
        }
    }
}

/// An entity related to another, as observed from one endpoint's refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedEntity {
    #[serde(flatten)]
    pub entity: EntityCore,
    pub match_type: MatchType,
    pub match_key: String,
    pub principle: String,
}

/// The authoritative, fully resolved state of an entity as returned by the
/// ER engine: its own records plus every entity it relates to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedEntity {
    #[serde(flatten)]
    pub entity: EntityCore,
    pub related_entities: BTreeMap<i64, RelatedEntity>,
}

/// Error returned when a `ResolvedEntity` would violate an invariant.
#[derive(Debug, thiserror::Error)]
pub enum ResolvedEntityError {
    #[error("related entity {0} is the same as the entity it relates to")]
    SelfRelation(i64),
}

impl ResolvedEntity {
    /// Builds a `ResolvedEntity`, rejecting self-relations (spec §3
    /// invariant: `forall r in relatedEntities: r.id != this.id`).
    pub fn new(
        entity: EntityCore,
        related_entities: Vec<RelatedEntity>,
    ) -> Result<Self, ResolvedEntityError> {
        for related in &related_entities {
            if related.entity.id == entity.id {
                return Err(ResolvedEntityError::SelfRelation(related.entity.id));
            }
        }
        Ok(Self {
            related_entities: related_entities
                .into_iter()
                .map(|r| (r.entity.id, r))
                .collect(),
            entity,
        })
    }
}

/// A normalized, canonicalized entity-to-entity relationship: `lo < hi`
/// always.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub lo: i64,
    pub hi: i64,
    pub match_level: i32,
    pub match_type: MatchType,
    pub match_key: String,
    pub principle: String,
    pub source_summary_lo: BTreeMap<String, usize>,
    pub source_summary_hi: BTreeMap<String, usize>,
}

impl Relationship {
    /// Builds the canonical relationship row from one endpoint's view of
    /// the pair: `resolved` is the entity whose refresh observed `related`.
    /// Flips and relabels the summaries so `lo`/`hi` line up regardless of
    /// which side is doing the observing.
    #[must_use]
    pub fn from_pair(resolved: &EntityCore, related: &RelatedEntity) -> Self {
        let resolved_summary = resolved.source_summary();
        let related_summary = related.entity.source_summary();
        if resolved.id < related.entity.id {
            Self {
                lo: resolved.id,
                hi: related.entity.id,
                match_level: match related.match_type {
                    MatchType::PossibleMatch => 2,
                    _ => 0,
                },
                match_type: related.match_type,
                match_key: related.match_key.clone(),
                principle: related.principle.clone(),
                source_summary_lo: resolved_summary,
                source_summary_hi: related_summary,
            }
        } else {
            Self {
                lo: related.entity.id,
                hi: resolved.id,
                match_level: match related.match_type {
                    MatchType::PossibleMatch => 2,
                    _ => 0,
                },
                match_type: related.match_type,
                match_key: related.match_key.clone(),
                principle: related.principle.clone(),
                source_summary_lo: related_summary,
                source_summary_hi: resolved_summary,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: i64, sources: &[&str]) -> EntityCore {
        EntityCore::new(
            id,
            None,
            sources
                .iter()
                .enumerate()
                .map(|(i, source)| {
                    Record::new(RecordKey::new((*source).to_owned(), i.to_string()), None, None)
                })
                .collect(),
        )
    }

    #[test]
    fn source_summary_matches_record_counts() {
        let e = entity(1, &["FOO", "FOO", "BAR"]);
        let summary = e.source_summary();
        assert_eq!(summary.get("FOO"), Some(&2));
        assert_eq!(summary.get("BAR"), Some(&1));
    }

    #[test]
    fn resolved_entity_rejects_self_relation() {
        let core = entity(1, &["FOO"]);
        let related = RelatedEntity {
            entity: entity(1, &["FOO"]),
            match_type: MatchType::PossibleRelation,
            match_key: "NAME".to_owned(),
            principle: "P1".to_owned(),
        };
        let err = ResolvedEntity::new(core, vec![related]).unwrap_err();
        assert!(matches!(err, ResolvedEntityError::SelfRelation(1)));
    }

    #[test]
    fn relationship_is_canonicalized_regardless_of_observer() {
        let a = entity(1, &["FOO"]);
        let b = entity(2, &["BAR"]);
        let related_from_a = RelatedEntity {
            entity: b.clone(),
            match_type: MatchType::PossibleRelation,
            match_key: "PHONE".to_owned(),
            principle: "SF1".to_owned(),
        };
        let related_from_b = RelatedEntity {
            entity: a.clone(),
            match_type: MatchType::PossibleRelation,
            match_key: "PHONE".to_owned(),
            principle: "SF1".to_owned(),
        };

        let from_a = Relationship::from_pair(&a, &related_from_a);
        let from_b = Relationship::from_pair(&b, &related_from_b);

        assert_eq!(from_a.lo, 1);
        assert_eq!(from_a.hi, 2);
        assert_eq!(from_a, from_b);
    }

    #[test]
    fn match_type_detection_cascade() {
        assert_eq!(MatchType::detect(true, true, 2), MatchType::AmbiguousMatch);
        assert_eq!(MatchType::detect(false, true, 2), MatchType::DisclosedRelation);
        assert_eq!(MatchType::detect(false, false, 2), MatchType::PossibleMatch);
        assert_eq!(MatchType::detect(false, false, 1), MatchType::PossibleRelation);
    }

    #[test]
    fn normalize_optional_blanks_to_none() {
        assert_eq!(normalize_optional(Some("  ")), None);
        assert_eq!(normalize_optional(Some("")), None);
        assert_eq!(normalize_optional(Some(" NAME+DOB ")), Some("NAME+DOB".to_owned()));
        assert_eq!(normalize_optional(None), None);
    }
}
