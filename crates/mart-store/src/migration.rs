//! Schema-migration contract, mirroring the teacher's
//! `hash_graph_store::migration::StoreMigration`. The `migrate` subcommand
//! in `apps/mart-replicator` calls this against whichever dialect adapter
//! was selected; the sqlite adapter's own `new` already makes this a no-op
//! in practice, but the trait exists so the CLI surface (spec §6) doesn't
//! need to special-case dialects.

use error_stack::{Report, ResultExt as _};

use crate::error::MigrationError;
use crate::pool::{MartStorePool, StorePool};
use crate::schema::BOOTSTRAP_SQL;

pub trait StoreMigration: StorePool {
    /// Applies any outstanding schema changes. Idempotent: running it
    /// against an already-current schema is a no-op.
    fn migrate(&self) -> impl Future<Output = Result<(), Report<MigrationError>>> + Send;
}

/// Runs the same bootstrap DDL the embedded backend applies on open
/// (`crate::sqlite::SqliteStorePool::new`). The `CREATE TABLE IF NOT
/// EXISTS`/`CREATE INDEX IF NOT EXISTS` forms make re-running it against an
/// already-migrated database a no-op, which is what makes this safe to call
/// from the `migrate` subcommand (spec §1's "an operator applies it out of
/// band" for the networked backend) against either dialect.
impl StoreMigration for MartStorePool {
    async fn migrate(&self) -> Result<(), Report<MigrationError>> {
        sqlx::raw_sql(BOOTSTRAP_SQL)
            .execute(self.raw())
            .await
            .change_context(MigrationError)
            .attach_printable("applying bootstrap schema")?;
        Ok(())
    }
}
