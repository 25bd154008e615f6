//! The embedded single-file backend. Unlike [`crate::postgres`], this
//! adapter self-bootstraps: there is no separate operator to apply DDL
//! against a file the process itself created, so `new` always ensures
//! [`crate::schema::BOOTSTRAP_SQL`] has been applied before returning.

use error_stack::{Report, ResultExt as _};

use crate::connection::{DatabaseConnectionInfo, DatabasePoolConfig, DatabaseType};
use crate::error::StoreError;
use crate::pool::MartStorePool;
use crate::schema::BOOTSTRAP_SQL;

#[derive(Debug, Clone)]
pub struct SqliteStorePool(MartStorePool);

impl SqliteStorePool {
    /// # Panics
    ///
    /// Panics if `info.database_type` is not [`DatabaseType::Sqlite`] — see
    /// [`crate::postgres::PostgresStorePool::new`] for the rationale.
    pub async fn new(
        info: &DatabaseConnectionInfo,
        pool_config: &DatabasePoolConfig,
    ) -> Result<Self, Report<StoreError>> {
        assert_eq!(
            info.database_type,
            DatabaseType::Sqlite,
            "SqliteStorePool::new called with a non-sqlite DatabaseConnectionInfo"
        );
        let pool = MartStorePool::connect(info, pool_config).await?;

        sqlx::raw_sql(BOOTSTRAP_SQL)
            .execute(pool.raw())
            .await
            .change_context(StoreError)
            .attach_printable("bootstrapping embedded sqlite schema")?;

        Ok(Self(pool))
    }

    #[must_use]
    pub fn as_pool(&self) -> &MartStorePool {
        &self.0
    }

    #[must_use]
    pub fn into_pool(self) -> MartStorePool {
        self.0
    }
}
