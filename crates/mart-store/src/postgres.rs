//! The networked backend. DDL is applied out of band by an operator (spec
//! §1) so this adapter only ever opens a pool — it never runs
//! [`crate::schema::BOOTSTRAP_SQL`].

use error_stack::Report;

use crate::connection::{DatabaseConnectionInfo, DatabasePoolConfig, DatabaseType};
use crate::error::StoreError;
use crate::pool::MartStorePool;

#[derive(Debug, Clone)]
pub struct PostgresStorePool(MartStorePool);

impl PostgresStorePool {
    /// # Panics
    ///
    /// Panics if `info.database_type` is not [`DatabaseType::Postgres`] —
    /// callers pick the adapter based on the same field, so a mismatch is a
    /// caller bug rather than a runtime condition to recover from.
    pub async fn new(
        info: &DatabaseConnectionInfo,
        pool_config: &DatabasePoolConfig,
    ) -> Result<Self, Report<StoreError>> {
        assert_eq!(
            info.database_type,
            DatabaseType::Postgres,
            "PostgresStorePool::new called with a non-postgres DatabaseConnectionInfo"
        );
        Ok(Self(MartStorePool::connect(info, pool_config).await?))
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
