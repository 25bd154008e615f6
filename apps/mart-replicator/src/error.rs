use core::{error::Error, fmt};

#[derive(Debug)]
pub struct ReplicatorError;

impl fmt::Display for ReplicatorError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str("the data-mart replicator encountered an error during execution")
    }
}

impl Error for ReplicatorError {}
