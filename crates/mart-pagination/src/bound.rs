//! Pagination bound parsing (spec.md §4.5).
//!
//! An entity-page bound is a plain integer id or the sentinel text `"max"`
//! (+∞). A relation-page bound is a colon-joined `(entityId, relatedId)`
//! pair or the sentinel text `"max:max"`. A `null` bound defaults to `0`
//! (`0:0` for relations) when scanning a lower bound, or the `"max"`
//! sentinel when scanning an upper one.

use crate::error::PaginationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundType {
    InclusiveLower,
    ExclusiveLower,
    InclusiveUpper,
    ExclusiveUpper,
}

impl BoundType {
    #[must_use]
    pub const fn is_lower(self) -> bool {
        matches!(self, Self::InclusiveLower | Self::ExclusiveLower)
    }

    #[must_use]
    pub const fn is_inclusive(self) -> bool {
        matches!(self, Self::InclusiveLower | Self::InclusiveUpper)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InclusiveLower => "INCLUSIVE_LOWER",
            Self::ExclusiveLower => "EXCLUSIVE_LOWER",
            Self::InclusiveUpper => "INCLUSIVE_UPPER",
            Self::ExclusiveUpper => "EXCLUSIVE_UPPER",
        }
    }
}

/// An entity-page bound: a plain id, or the sentinel `"max"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EntityBound {
    Id(i64),
    Max,
}

impl EntityBound {
    /// # Errors
    /// Returns [`PaginationError::MalformedInput`] if `text` is neither
    /// `"max"` nor a parseable integer.
    pub fn parse(text: Option<&str>, bound_type: BoundType) -> Result<Self, PaginationError> {
        match text {
            None => Ok(if bound_type.is_lower() { Self::Id(0) } else { Self::Max }),
            Some("max") => Ok(Self::Max),
            Some(text) => text.parse::<i64>().map(Self::Id).map_err(|_| {
                PaginationError::MalformedInput(format!("entity bound {text:?} is not an integer"))
            }),
        }
    }

    /// Whether `id` satisfies this bound under `bound_type`.
    #[must_use]
    pub fn admits(self, id: i64, bound_type: BoundType) -> bool {
        match (self, bound_type) {
            (Self::Max, bt) => !bt.is_lower(),
            (Self::Id(bound), BoundType::InclusiveLower) => id >= bound,
            (Self::Id(bound), BoundType::ExclusiveLower) => id > bound,
            (Self::Id(bound), BoundType::InclusiveUpper) => id <= bound,
            (Self::Id(bound), BoundType::ExclusiveUpper) => id < bound,
        }
    }
}

/// A relation-page bound: an `(entityId, relatedId)` pair, or `"max:max"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RelationBound {
    Id(i64, i64),
    Max,
}

impl RelationBound {
    /// # Errors
    /// Returns [`PaginationError::MalformedInput`] if `text` is malformed.
    pub fn parse(text: Option<&str>, bound_type: BoundType) -> Result<Self, PaginationError> {
        match text {
            None => Ok(if bound_type.is_lower() { Self::Id(0, 0) } else { Self::Max }),
            Some("max:max") => Ok(Self::Max),
            Some(text) => {
                let (lhs, rhs) = text.split_once(':').ok_or_else(|| {
                    PaginationError::MalformedInput(format!("relation bound {text:?} is malformed"))
                })?;
                let lhs = lhs.parse::<i64>().map_err(|_| {
                    PaginationError::MalformedInput(format!("relation bound {text:?} is malformed"))
                })?;
                let rhs = rhs.parse::<i64>().map_err(|_| {
                    PaginationError::MalformedInput(format!("relation bound {text:?} is malformed"))
                })?;
                Ok(Self::Id(lhs, rhs))
            }
        }
    }

    #[must_use]
    pub fn admits(self, pair: (i64, i64), bound_type: BoundType) -> bool {
        match (self, bound_type) {
            (Self::Max, bt) => !bt.is_lower(),
            (Self::Id(bound), BoundType::InclusiveLower) => pair >= bound,
            (Self::Id(bound), BoundType::ExclusiveLower) => pair > bound,
            (Self::Id(bound), BoundType::InclusiveUpper) => pair <= bound,
            (Self::Id(bound), BoundType::ExclusiveUpper) => pair < bound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_bound_defaults_by_direction() {
        assert_eq!(EntityBound::parse(None, BoundType::InclusiveLower).unwrap(), EntityBound::Id(0));
        assert_eq!(EntityBound::parse(None, BoundType::InclusiveUpper).unwrap(), EntityBound::Max);
        assert_eq!(
            RelationBound::parse(None, BoundType::ExclusiveLower).unwrap(),
            RelationBound::Id(0, 0)
        );
    }

    #[test]
    fn max_sentinel_parses() {
        assert_eq!(EntityBound::parse(Some("max"), BoundType::InclusiveUpper).unwrap(), EntityBound::Max);
        assert_eq!(
            RelationBound::parse(Some("max:max"), BoundType::InclusiveUpper).unwrap(),
            RelationBound::Max
        );
    }

    #[test]
    fn non_integer_entity_bound_is_rejected() {
        assert!(EntityBound::parse(Some("seven"), BoundType::InclusiveLower).is_err());
    }

    #[test]
    fn malformed_relation_bound_is_rejected() {
        assert!(RelationBound::parse(Some("7"), BoundType::InclusiveLower).is_err());
        assert!(RelationBound::parse(Some("a:b"), BoundType::InclusiveLower).is_err());
    }
}
