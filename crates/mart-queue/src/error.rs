use core::fmt;

/// Carried inside `error_stack::Report` for every queue operation — see
/// `mart_store::StoreError` for the same shape at the pool layer.
#[derive(Debug)]
pub struct QueueError;

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("the pending-event queue encountered an error")
    }
}

impl core::error::Error for QueueError {}
