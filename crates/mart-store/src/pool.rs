//! The connection-pool abstraction both dialect adapters implement.
//!
//! Mirrors the teacher's `hash_graph_store::pool::StorePool` /
//! `hash_graph_postgres_store::store::PostgresStorePool` split: a trait for
//! "a thing you can acquire connections and transactions from", and one
//! concrete pool type per dialect. Both concrete types here are thin
//! wrappers over a single `sqlx::AnyPool` (see `DESIGN.md` for why `sqlx`
//! replaces the teacher's `tokio-postgres` + `deadpool-postgres` pairing):
//! `sqlx::Any` is itself "a single abstracted query surface" over the two
//! backends spec §1 calls for, so the pool, connection, and transaction
//! types are literally shared rather than merely parallel.

use error_stack::{Report, ResultExt as _};
use sqlx::any::{Any, AnyPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::{Pool, Transaction};

use crate::connection::{DatabaseConnectionInfo, DatabasePoolConfig, DatabaseType};
use crate::error::StoreError;

/// A pool capable of acquiring connections and scoped transactions.
///
/// Acquisition is scoped: the returned guard releases the connection back
/// to the pool on drop along every exit path (spec §5), which `sqlx`'s
/// `PoolConnection`/`Transaction` guards already guarantee.
pub trait StorePool: Send + Sync {
    /// Which dialect this pool was opened against.
    fn dialect(&self) -> DatabaseType;

    /// Acquires a single connection from the pool.
    fn acquire(
        &self,
    ) -> impl Future<Output = Result<PoolConnection<Any>, Report<StoreError>>> + Send;

    /// Begins a scoped transaction. Committing, rolling back, or dropping
    /// the transaction releases the underlying connection.
    fn begin(
        &self,
    ) -> impl Future<Output = Result<Transaction<'static, Any>, Report<StoreError>>> + Send;
}

/// The concrete pool shared by both dialect adapters.
#[derive(Debug, Clone)]
pub struct MartStorePool {
    pool: Pool<Any>,
    dialect: DatabaseType,
}

impl MartStorePool {
    pub(crate) async fn connect(
        info: &DatabaseConnectionInfo,
        pool_config: &DatabasePoolConfig,
    ) -> Result<Self, Report<StoreError>> {
        sqlx::any::install_default_drivers();

        let pool = AnyPoolOptions::new()
            .min_connections(pool_config.min_idle)
            .max_connections(pool_config.max_open)
            .connect(&info.connection_url())
            .await
            .change_context(StoreError)
            .attach_printable_lazy(|| format!("dialect: {}", info.database_type))?;

        Ok(Self {
            pool,
            dialect: info.database_type,
        })
    }

    /// The raw `sqlx` pool, for adapters that need to run dialect-specific
    /// bootstrap SQL.
    #[must_use]
    pub fn raw(&self) -> &Pool<Any> {
        &self.pool
    }
}

impl StorePool for MartStorePool {
    fn dialect(&self) -> DatabaseType {
        self.dialect
    }

    async fn acquire(&self) -> Result<PoolConnection<Any>, Report<StoreError>> {
        self.pool.acquire().await.change_context(StoreError)
    }

    async fn begin(&self) -> Result<Transaction<'static, Any>, Report<StoreError>> {
        self.pool.begin().await.change_context(StoreError)
    }
}
