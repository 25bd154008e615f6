//! Durable pending-event queue with lease-based at-least-once delivery
//! (spec.md §4.1), plus the dead-letter table a poison message is moved to
//! (spec.md §4.2).

pub mod dead_letter;
pub mod error;
pub mod queue;
pub mod sweeper;

pub use dead_letter::{DeadLetterRow, DeadLetterStore};
pub use error::QueueError;
pub use queue::{EventQueue, LeasedEvent};
pub use sweeper::LeaseSweeper;
