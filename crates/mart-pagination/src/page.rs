//! The stateless `Page<T>` result type (spec.md §4.5). No cursor is stored
//! server-side: bound + direction together fully identify the next page.

use crate::bound::BoundType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub bound: String,
    pub bound_type: BoundType,
    pub page_size: i64,
    pub sample_size: Option<i64>,
    /// Extrema within the returned window. Absent only for an empty page.
    pub page_min: Option<T>,
    pub page_max: Option<T>,
    /// Extrema of the whole population. Omitted when `sample_size` is set
    /// (spec.md §4.5: "overallMin/overallMax are omitted" for sampled pages).
    pub overall_min: Option<T>,
    pub overall_max: Option<T>,
    /// Counts strictly outside the window in the scan direction.
    pub before_page_count: i64,
    pub after_page_count: i64,
    pub total_count: i64,
    pub items: Vec<T>,
}
