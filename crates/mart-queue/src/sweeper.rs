//! Background interval task that reclaims expired leases independently of
//! any worker's own lease acquisition (spec.md §4.1). `lease_batch` already
//! reclaims defensively before leasing, so the sweeper exists purely to
//! bound how long an abandoned lease sits unreclaimed when no worker is
//! currently asking for work.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use mart_store::pool::StorePool;
use tracing::{info, warn};

use crate::queue::EventQueue;

pub struct LeaseSweeper<P> {
    queue: Arc<EventQueue<P>>,
    interval: StdDuration,
}

impl<P: StorePool + 'static> LeaseSweeper<P> {
    #[must_use]
    pub fn new(queue: Arc<EventQueue<P>>, interval: StdDuration) -> Self {
        Self { queue, interval }
    }

    /// Runs until `stop` resolves. Intended to be spawned as its own task
    /// alongside the worker pool.
    pub async fn run(self, mut stop: tokio::sync::watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = stop.changed() => {
                    if *stop.borrow() {
                        return;
                    }
                }
                _ = ticker.tick() => {
                    match self.queue.reclaim_expired_leases().await {
                        Ok(0) => {}
                        Ok(reclaimed) => info!(reclaimed, "swept expired leases"),
                        Err(report) => warn!(error = ?report, "lease sweep failed"),
                    }
                }
            }
        }
    }
}
