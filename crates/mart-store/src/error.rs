//! Error kinds this crate distinguishes. These are marker types carried
//! inside `error_stack::Report`, the same shape the teacher uses for
//! `GraphError`/`HealthcheckError` — a plain `Display`+`Error` type, never
//! a rich enum of causes (those live in the `Report`'s attachment chain).

use core::fmt;

/// Maps to spec §7's `TransportTransient`/`TransportPermanent` distinction
/// at the store layer: connection/pool failures the caller should treat as
/// retryable vs. not.
#[derive(Debug)]
pub struct StoreError;

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the store encountered an error acquiring a connection or running a query")
    }
}

impl core::error::Error for StoreError {}

#[derive(Debug)]
pub struct MigrationError;

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("failed to bootstrap or verify the mart schema")
    }
}

impl core::error::Error for MigrationError {}
