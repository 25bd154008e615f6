use clap::Parser;
use error_stack::{Report, ResultExt as _};
use mart_store::{DatabaseConnectionInfo, DatabasePoolConfig, StoreMigration as _};

use crate::error::ReplicatorError;
use crate::store::open_pool;

#[derive(Debug, Parser)]
#[clap(version, author, about, long_about = None)]
pub struct MigrateArgs {
    #[clap(flatten)]
    pub db_info: DatabaseConnectionInfo,

    #[clap(flatten)]
    pub pool_config: DatabasePoolConfig,
}

pub async fn migrate(args: MigrateArgs) -> Result<(), Report<ReplicatorError>> {
    let pool = open_pool(&args.db_info, &args.pool_config).await?;

    pool.migrate()
        .await
        .change_context(ReplicatorError)
        .map_err(|report| {
            tracing::error!(error = ?report, "failed to run migrations");
            report
        })?;

    tracing::info!("schema is up to date");
    Ok(())
}
