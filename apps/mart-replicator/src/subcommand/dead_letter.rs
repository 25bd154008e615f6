use clap::Parser;
use error_stack::{Report, ResultExt as _};
use mart_queue::DeadLetterStore;
use mart_store::{DatabaseConnectionInfo, DatabasePoolConfig};

use crate::error::ReplicatorError;
use crate::store::open_pool;

#[derive(Debug, Parser)]
#[clap(version, author, about, long_about = None)]
pub struct DeadLetterArgs {
    #[clap(flatten)]
    pub db_info: DatabaseConnectionInfo,

    #[clap(flatten)]
    pub pool_config: DatabasePoolConfig,
}

pub async fn list(args: DeadLetterArgs) -> Result<(), Report<ReplicatorError>> {
    let pool = open_pool(&args.db_info, &args.pool_config).await?;
    let store = DeadLetterStore::new(pool);

    let rows = store
        .list()
        .await
        .change_context(ReplicatorError)
        .attach_printable("listing dead-lettered events")?;

    if rows.is_empty() {
        println!("no dead-lettered events");
        return Ok(());
    }

    for row in rows {
        println!(
            "#{id} first_failed_at={first_failed_at} attempts={attempt_count} error={last_error_chain}\n  payload: {payload}",
            id = row.id,
            first_failed_at = row.first_failed_at,
            attempt_count = row.attempt_count,
            last_error_chain = row.last_error_chain,
            payload = row.payload,
        );
    }

    Ok(())
}
