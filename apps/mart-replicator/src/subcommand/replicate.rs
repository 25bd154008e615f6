use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use clap::Parser;
use error_stack::{Report, ResultExt as _};
use mart_engine::{HttpErEngineClient, Scheduler, SchedulerConfig};
use mart_queue::{EventQueue, LeaseSweeper};
use mart_store::{DatabaseConnectionInfo, DatabasePoolConfig, MartStorePool};
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio::sync::watch;

use crate::error::ReplicatorError;
use crate::store::open_pool;

#[derive(Debug, Parser)]
#[clap(version, author, about, long_about = None)]
pub struct ReplicateArgs {
    #[clap(flatten)]
    pub db_info: DatabaseConnectionInfo,

    #[clap(flatten)]
    pub pool_config: DatabasePoolConfig,

    /// Base URL of the ER engine's `getEntity` HTTP surface.
    #[clap(long, env = "MART_ER_ENGINE_URL")]
    pub er_engine_url: String,

    #[clap(long, env = "MART_WORKER_COUNT", default_value_t = 4)]
    pub worker_count: usize,

    #[clap(long, env = "MART_BATCH_SIZE", default_value_t = 16)]
    pub batch_size: i64,

    #[clap(long, env = "MART_LEASE_SECONDS", default_value_t = 30)]
    pub lease_seconds: i64,

    #[clap(long, env = "MART_MAX_ATTEMPTS", default_value_t = 5)]
    pub max_attempts: u32,

    #[clap(long, env = "MART_SWEEP_SECONDS", default_value_t = 60)]
    pub sweep_seconds: u64,

    /// Read newline-delimited change-event JSON from stdin and enqueue it.
    /// The production message transport is out of scope (spec §1's
    /// non-goal); this is the dev stand-in that makes the scheduler
    /// exercisable end to end without one.
    #[clap(long)]
    pub ingest_stdin: bool,
}

pub async fn replicate(args: ReplicateArgs) -> Result<(), Report<ReplicatorError>> {
    let pool = open_pool(&args.db_info, &args.pool_config).await?;

    let er_client = Arc::new(HttpErEngineClient::new(
        reqwest::Client::new(),
        args.er_engine_url.clone(),
    ));
    let config = SchedulerConfig {
        worker_count: args.worker_count,
        batch_size: args.batch_size,
        lease_duration: Duration::seconds(args.lease_seconds),
        max_attempts: args.max_attempts,
    };
    let scheduler = Arc::new(Scheduler::new(pool.clone(), er_client, config));
    let queue = Arc::new(EventQueue::new(pool.clone()));
    let sweeper = LeaseSweeper::new(Arc::clone(&queue), StdDuration::from_secs(args.sweep_seconds));

    let (stop_tx, stop_rx) = watch::channel(false);

    let worker_handle = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        let stop_rx = stop_rx.clone();
        async move { scheduler.run(stop_rx).await }
    });
    let sweeper_handle = tokio::spawn(sweeper.run(stop_rx.clone()));

    let ingest_handle = args
        .ingest_stdin
        .then(|| tokio::spawn(ingest_stdin(Arc::clone(&queue))));

    tokio::signal::ctrl_c()
        .await
        .change_context(ReplicatorError)
        .attach_printable("waiting for shutdown signal")?;
    tracing::info!("shutdown requested, draining in-flight refreshes");
    let _ = stop_tx.send(true);

    worker_handle.await.change_context(ReplicatorError)?;
    sweeper_handle.await.change_context(ReplicatorError)?;
    if let Some(handle) = ingest_handle {
        handle.await.change_context(ReplicatorError)??;
    }

    Ok(())
}

async fn ingest_stdin(queue: Arc<EventQueue<MartStorePool>>) -> Result<(), Report<ReplicatorError>> {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .change_context(ReplicatorError)
        .attach_printable("reading a change-event line from stdin")?
    {
        if line.trim().is_empty() {
            continue;
        }
        match queue.enqueue(&line).await {
            Ok(id) => tracing::debug!(event_id = id, "enqueued change event"),
            Err(report) => tracing::warn!(error = ?report, "failed to enqueue change event"),
        }
    }
    Ok(())
}
