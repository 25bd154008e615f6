//! Opens the right dialect adapter for a `DatabaseConnectionInfo` and hands
//! back the shared [`MartStorePool`] every subcommand operates against —
//! the dialect only matters at connect time (spec §1).

use error_stack::{Report, ResultExt as _};
use mart_store::{
    DatabaseConnectionInfo, DatabasePoolConfig, DatabaseType, MartStorePool, PostgresStorePool,
    SqliteStorePool,
};

use crate::error::ReplicatorError;

pub async fn open_pool(
    info: &DatabaseConnectionInfo,
    pool_config: &DatabasePoolConfig,
) -> Result<MartStorePool, Report<ReplicatorError>> {
    match info.database_type {
        DatabaseType::Postgres => Ok(PostgresStorePool::new(info, pool_config)
            .await
            .change_context(ReplicatorError)
            .attach_printable("connecting to postgres")?
            .into_pool()),
        DatabaseType::Sqlite => Ok(SqliteStorePool::new(info, pool_config)
            .await
            .change_context(ReplicatorError)
            .attach_printable("opening embedded sqlite database")?
            .into_pool()),
    }
}
