//! Connection pool, scoped transactions, and dialect isolation for the
//! data-mart replicator.
//!
//! `sqlx`'s `Any` driver is the "single abstracted query surface" spec §1
//! asks for across the embedded and networked backends: [`pool::MartStorePool`]
//! wraps one `sqlx::AnyPool`, and [`postgres::PostgresStorePool`] /
//! [`sqlite::SqliteStorePool`] differ only in connection-string shape and
//! whether they self-bootstrap the schema.

pub mod connection;
pub mod error;
pub mod migration;
pub mod pool;
pub mod postgres;
pub mod schema;
pub mod sqlite;

pub use connection::{DatabaseConnectionInfo, DatabasePoolConfig, DatabaseType};
pub use error::{MigrationError, StoreError};
pub use migration::StoreMigration;
pub use pool::{MartStorePool, StorePool};
pub use postgres::PostgresStorePool;
pub use sqlite::SqliteStorePool;
