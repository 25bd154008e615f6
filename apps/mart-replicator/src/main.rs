#![forbid(unsafe_code)]

mod args;
mod error;
mod store;
mod subcommand;

use error_stack::Report;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt as _, util::SubscriberInitExt as _};

use self::{args::Args, error::ReplicatorError};

fn init_tracing(log_filter: Option<String>) {
    let filter = log_filter
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<(), Report<ReplicatorError>> {
    let Args {
        log_filter,
        subcommand,
    } = Args::parse_args();

    init_tracing(log_filter);

    subcommand.execute()
}
