//! The error taxonomy spec.md §7 asks the core to distinguish. Unlike
//! `mart-store`/`mart-queue`'s single marker-struct-per-crate shape, these
//! tags are meaningfully different to a *caller* (retry vs. surface vs.
//! dead-letter), so they are one enum rather than one marker type, still
//! carried inside `error_stack::Report` for the attachment chain.

#[derive(Debug, thiserror::Error)]
pub enum MartError {
    /// Bad report-key text, invalid bound, invalid pagination parameters.
    /// Surfaced to the caller directly; never retried.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Database deadlock, connection reset, ER-engine timeout. The refresh
    /// transaction rolls back; the event's lease is left to expire so the
    /// event is redelivered.
    #[error("transient transport failure: {0}")]
    TransportTransient(String),

    /// Schema mismatch, auth failure. The worker exits; the control plane
    /// is expected to alert.
    #[error("permanent transport failure: {0}")]
    TransportPermanent(String),

    /// The event source could not be initialized. Fatal during startup.
    #[error("could not initialize the event source: {0}")]
    ConsumerSetup(String),

    /// Repeated `TransportTransient` on the same event beyond the
    /// configured cap. Moved to dead-letter; processing resumes.
    #[error("event poisoned after repeated failures: {0}")]
    Poison(String),

    /// The ER response violates an invariant (e.g. a related entity with
    /// the observing entity's own id). Logged with the full JSON, the
    /// event is moved to dead-letter; does not block other entities.
    #[error("ER response violates an invariant: {0}")]
    Logic(String),
}
