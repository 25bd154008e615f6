//! Bounded, sampleable pagination over report-key partitions (spec.md
//! §4.5): the read side the incremental-replication core
//! (`mart-engine`, `mart-queue`) feeds via `report_detail`.

pub mod bound;
pub mod engine;
pub mod error;
pub mod page;

pub use bound::{BoundType, EntityBound, RelationBound};
pub use engine::{DEFAULT_PAGE_SIZE, PaginationEngine, SAMPLE_SIZE_MULTIPLIER};
pub use error::PaginationError;
pub use page::Page;
