use mart_store::{DatabaseConnectionInfo, DatabasePoolConfig, DatabaseType, SqliteStorePool, StorePool};
use sqlx::pool::PoolConnection;
use sqlx::Any;
use tempfile::NamedTempFile;

pub(crate) fn init_logging() {
    let _: Result<_, _> = tracing_subscriber::fmt()
        .with_ansi(true)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_file(true)
        .with_line_number(true)
        .with_test_writer()
        .try_init();
}

/// A throwaway sqlite-backed store, bootstrapped fresh per test.
///
/// Tests run against the embedded backend rather than postgres: it needs
/// no external service, and both dialects share the same `sqlx::Any` query
/// surface, so coverage here exercises the same SQL the postgres adapter
/// runs.
pub struct DatabaseTestWrapper {
    _db_file: NamedTempFile,
    _pool: SqliteStorePool,
    pub connection: PoolConnection<Any>,
}

impl DatabaseTestWrapper {
    pub async fn new() -> Self {
        init_logging();

        let db_file = NamedTempFile::new().expect("could not create scratch database file");
        let connection_info = DatabaseConnectionInfo::new(
            DatabaseType::Sqlite,
            String::new(),
            String::new(),
            String::new(),
            0,
            db_file.path().display().to_string(),
        );

        let pool = SqliteStorePool::new(&connection_info, &DatabasePoolConfig::default())
            .await
            .expect("could not open scratch database");

        let connection = pool
            .as_pool()
            .acquire()
            .await
            .expect("could not acquire a database connection");

        Self {
            _db_file: db_file,
            _pool: pool,
            connection,
        }
    }
}
