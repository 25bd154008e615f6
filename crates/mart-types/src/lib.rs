//! Data model, report-key codec, and snapshot-hash codec for the data-mart
//! replicator.
//!
//! This crate holds only plain value types and pure functions over them —
//! no I/O, no SQL, no async. `mart-store`, `mart-queue`, `mart-engine`, and
//! `mart-pagination` all depend on it for a shared vocabulary.

pub mod codec;
pub mod event;
pub mod match_key;
pub mod model;
pub mod report_key;

pub use codec::{SnapshotCodecError, decode_snapshot, encode_snapshot};
pub use event::{AffectedEntity, ChangeEventPayload, PendingEventRow};
pub use match_key::{match_keys_equivalent, normalize_match_key_tokens, reverse_match_key};
pub use model::{
    EntityCore, MatchType, Record, RecordKey, RelatedEntity, Relationship, ResolvedEntity,
    ResolvedEntityError, normalize_optional,
};
pub use report_key::{
    BaseStatistic, ReportCode, ReportKey, ReportKeyParseError, ReportStatistic, ReportUpdate,
};
