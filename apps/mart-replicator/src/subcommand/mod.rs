mod dead_letter;
mod fold;
mod migrate;
mod replicate;

use error_stack::Report;

pub use self::{
    dead_letter::{DeadLetterArgs, list as dead_letter_list},
    fold::{FoldArgs, fold},
    migrate::{MigrateArgs, migrate},
    replicate::{ReplicateArgs, replicate},
};
use crate::error::ReplicatorError;

/// Subcommand for the program.
#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    /// Apply schema migrations required by the data mart.
    Migrate(MigrateArgs),
    /// Run the replication scheduler: lease pending events, refresh the
    /// affected entities against the ER engine, and persist the resulting
    /// report-update journal rows.
    Replicate(ReplicateArgs),
    /// Fold pending report-update journal rows into the report counters.
    Fold(FoldArgs),
    /// List dead-lettered events that exhausted their retry budget.
    DeadLetter(DeadLetterArgs),
}

fn block_on(
    future: impl Future<Output = Result<(), Report<ReplicatorError>>>,
) -> Result<(), Report<ReplicatorError>> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create runtime")
        .block_on(future)
}

impl Subcommand {
    pub(crate) fn execute(self) -> Result<(), Report<ReplicatorError>> {
        match self {
            Self::Migrate(args) => block_on(migrate(args)),
            Self::Replicate(args) => block_on(replicate(args)),
            Self::Fold(args) => block_on(fold(args)),
            Self::DeadLetter(args) => block_on(dead_letter_list(args)),
        }
    }
}
