//! This crate's slice of the error taxonomy (spec.md §7). Pagination never
//! talks to the ER engine and never retries, so only two of the six tags
//! apply here: a bad bound or page/sample parameter is `MalformedInput`,
//! surfaced to the caller directly; a database failure is
//! `TransportTransient`.

#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    #[error("invalid arguments: {0}")]
    MalformedInput(String),
    #[error("transport error: {0}")]
    TransportTransient(String),
}
