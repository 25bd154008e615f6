use std::collections::BTreeSet;
use std::fmt;

use clap::Parser;
use error_stack::{Report, ResultExt as _};
use mart_engine::scope::{SourceScope, SourceScopeMode};
use mart_store::{DatabaseConnectionInfo, DatabasePoolConfig};

use crate::error::ReplicatorError;
use crate::store::open_pool;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum ScopeMode {
    /// Only data sources with at least one loaded record.
    Loaded,
    /// Every configured source minus the well-known template defaults.
    AllButDefault,
    /// Every configured source, defaults included.
    AllWithDefault,
}

impl fmt::Display for ScopeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loaded => "loaded",
            Self::AllButDefault => "all-but-default",
            Self::AllWithDefault => "all-with-default",
        })
    }
}

impl From<ScopeMode> for SourceScopeMode {
    fn from(mode: ScopeMode) -> Self {
        match mode {
            ScopeMode::Loaded => Self::Loaded,
            ScopeMode::AllButDefault => Self::AllButDefault,
            ScopeMode::AllWithDefault => Self::AllWithDefault,
        }
    }
}

#[derive(Debug, Parser)]
#[clap(version, author, about, long_about = None)]
pub struct FoldArgs {
    #[clap(flatten)]
    pub db_info: DatabaseConnectionInfo,

    #[clap(flatten)]
    pub pool_config: DatabasePoolConfig,

    /// Rows to fold per transaction.
    #[clap(long, default_value_t = 1000)]
    pub batch_size: i64,

    /// Fold one batch and exit instead of draining the whole journal.
    #[clap(long)]
    pub once: bool,

    /// Data-source scope to materialize zero `report_counter` rows for
    /// before folding, so a configured-but-empty source reports zero
    /// rather than null (spec.md §4.6).
    #[clap(long, value_enum, default_value_t = ScopeMode::Loaded)]
    pub scope: ScopeMode,

    /// Every data source known to the system, independent of what is
    /// currently loaded. Required for `--scope all-but-default` /
    /// `all-with-default`; ignored for `--scope loaded`.
    #[clap(long = "configured-source")]
    pub configured_sources: Vec<String>,

    /// Extra source names whose zero rows must be materialized regardless
    /// of scope.
    #[clap(long = "extra-source")]
    pub extra_sources: Vec<String>,
}

pub async fn fold(args: FoldArgs) -> Result<(), Report<ReplicatorError>> {
    let pool = open_pool(&args.db_info, &args.pool_config).await?;

    let configured_sources: BTreeSet<String> = args.configured_sources.into_iter().collect();
    let extra_sources: BTreeSet<String> = args.extra_sources.into_iter().collect();

    let materialized = SourceScope::new(pool.clone())
        .materialize(args.scope.into(), &configured_sources, &extra_sources)
        .await
        .change_context(ReplicatorError)
        .attach_printable("materializing zero-row report counters")?;
    tracing::info!(rows_materialized = materialized, "zero-row materialization complete");

    let mut total = 0u64;
    loop {
        let folded = mart_engine::journal::apply_batch(&pool, args.batch_size)
            .await
            .change_context(ReplicatorError)
            .attach_printable("folding report-update journal rows into report counters")?;
        total += folded;

        if folded == 0 || args.once {
            break;
        }
    }

    tracing::info!(rows_folded = total, "journal fold complete");
    Ok(())
}
