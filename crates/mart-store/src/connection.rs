//! CLI-flattenable connection and pool configuration, mirroring the
//! teacher's `DatabaseConnectionInfo`/`DatabasePoolConfig` split so the
//! `migrate`/`replicate` subcommands can `#[clap(flatten)]` both.

use core::fmt;

#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    Postgres,
    Sqlite,
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
        })
    }
}

/// Everything needed to build a connection URL for either backend.
///
/// For [`DatabaseType::Sqlite`], `database` is interpreted as a filesystem
/// path and `user`/`password`/`host`/`port` are ignored — the embedded
/// backend has no such concept.
#[cfg_attr(feature = "clap", derive(clap::Parser))]
#[derive(Debug, Clone)]
pub struct DatabaseConnectionInfo {
    #[cfg_attr(
        feature = "clap",
        clap(long = "db-type", value_enum, env = "MART_DB_TYPE", default_value_t = DatabaseType::Sqlite)
    )]
    pub database_type: DatabaseType,

    #[cfg_attr(feature = "clap", clap(long = "db-user", env = "MART_PG_USER", default_value = "mart"))]
    pub user: String,

    #[cfg_attr(feature = "clap", clap(long = "db-password", env = "MART_PG_PASSWORD", default_value = "mart"))]
    pub password: String,

    #[cfg_attr(feature = "clap", clap(long = "db-host", env = "MART_PG_HOST", default_value = "localhost"))]
    pub host: String,

    #[cfg_attr(feature = "clap", clap(long = "db-port", env = "MART_PG_PORT", default_value_t = 5432))]
    pub port: u16,

    #[cfg_attr(
        feature = "clap",
        clap(long = "db-name", env = "MART_DB_NAME", default_value = "mart.db")
    )]
    pub database: String,
}

impl DatabaseConnectionInfo {
    #[must_use]
    pub fn new(
        database_type: DatabaseType,
        user: String,
        password: String,
        host: String,
        port: u16,
        database: String,
    ) -> Self {
        Self {
            database_type,
            user,
            password,
            host,
            port,
            database,
        }
    }

    /// Builds the `sqlx`-accepted connection URL for this backend.
    #[must_use]
    pub fn connection_url(&self) -> String {
        match self.database_type {
            DatabaseType::Postgres => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.user, self.password, self.host, self.port, self.database
            ),
            DatabaseType::Sqlite => format!("sqlite://{}?mode=rwc", self.database),
        }
    }
}

/// `[minIdle, maxOpen]` from spec §5.
#[cfg_attr(feature = "clap", derive(clap::Parser))]
#[derive(Debug, Clone)]
pub struct DatabasePoolConfig {
    #[cfg_attr(feature = "clap", clap(long, env = "MART_DB_MIN_IDLE", default_value_t = 1))]
    pub min_idle: u32,

    #[cfg_attr(feature = "clap", clap(long, env = "MART_DB_MAX_OPEN", default_value_t = 10))]
    pub max_open: u32,
}

impl Default for DatabasePoolConfig {
    fn default() -> Self {
        Self {
            min_idle: 1,
            max_open: 10,
        }
    }
}
