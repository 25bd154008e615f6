//! Per-entity refresh scheduler, snapshot-diff engine, and report-update
//! journal fold — the two tightly coupled subsystems spec.md §1 calls "the
//! core": incremental replication (`scheduler`, `diff`, `journal`) and the
//! data-source scope control (`scope`) that the report-query layer
//! (`mart-pagination`) leans on.

pub mod delta;
pub mod diff;
pub mod er_client;
pub mod error;
pub mod journal;
pub mod scheduler;
pub mod scope;

pub use er_client::{ErEngineClient, HttpErEngineClient, StaticErEngineClient};
pub use error::MartError;
pub use scheduler::{Scheduler, SchedulerConfig};
pub use scope::{SourceScope, SourceScopeMode, TEMPLATE_DEFAULT_SOURCES};
