//! The refresh scheduler (spec.md §4.2): a worker pool leasing batches off
//! `mart-queue::EventQueue`, serialized per entity id by an in-memory lock
//! registry so at most one refresh per entity is ever in flight.
//!
//! Worker-pool shape grounded on the teacher's multi-threaded `tokio`
//! runtime + `tokio::spawn` precedent (`apps/hash-graph`'s subcommands);
//! the per-entity registry itself has no teacher precedent and is a plain
//! `dashmap` ecosystem pick (see `DESIGN.md`).

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use dashmap::DashMap;
use error_stack::{Report, ResultExt as _};
use mart_queue::{DeadLetterStore, EventQueue, LeasedEvent};
use mart_store::pool::StorePool;
use mart_types::ChangeEventPayload;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::diff;
use crate::er_client::ErEngineClient;
use crate::error::MartError;

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub worker_count: usize,
    pub batch_size: i64,
    pub lease_duration: Duration,
    /// Repeated `TransportTransient` failures on the same event beyond this
    /// count moves it to the dead-letter table (spec.md §4.2).
    pub max_attempts: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            batch_size: 16,
            lease_duration: Duration::seconds(30),
            max_attempts: 5,
        }
    }
}

/// Per-entity lock registry. Attempt counts are tracked here too —
/// in-memory only, so a process restart forgets prior failures on an
/// event. That bounds poison detection to one process's lifetime rather
/// than surviving crashes indefinitely; acceptable since a crash-looping
/// worker is itself the kind of condition an operator would notice and
/// intervene on (noted in `DESIGN.md`).
pub struct Scheduler<P, C> {
    pool: P,
    er_client: Arc<C>,
    queue: Arc<EventQueue<P>>,
    dead_letters: Arc<DeadLetterStore<P>>,
    locks: DashMap<i64, Arc<Mutex<()>>>,
    attempts: DashMap<i64, u32>,
    config: SchedulerConfig,
}

impl<P, C> Scheduler<P, C>
where
    P: StorePool + Clone + 'static,
    C: ErEngineClient + 'static,
{
    #[must_use]
    pub fn new(pool: P, er_client: Arc<C>, config: SchedulerConfig) -> Self {
        Self {
            queue: Arc::new(EventQueue::new(pool.clone())),
            dead_letters: Arc::new(DeadLetterStore::new(pool.clone())),
            pool,
            er_client,
            locks: DashMap::new(),
            attempts: DashMap::new(),
            config,
        }
    }

    fn lock_for(&self, entity_id: i64) -> Arc<Mutex<()>> {
        self.locks
            .entry(entity_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn refresh_affected_entities(&self, payload: &str) -> Result<(), Report<MartError>> {
        let parsed: ChangeEventPayload = serde_json::from_str(payload)
            .change_context(MartError::MalformedInput(format!("undecodable event payload: {payload}")))?;

        for entity_id in parsed.entity_ids() {
            let lock = self.lock_for(entity_id);
            let _guard = lock.lock().await;
            diff::refresh(&self.pool, self.er_client.as_ref(), entity_id).await?;
        }
        Ok(())
    }

    async fn process_event(&self, event: LeasedEvent) {
        let key = event.id;
        match self.refresh_affected_entities(&event.payload).await {
            Ok(()) => {
                self.attempts.remove(&key);
                match self.queue.ack(event.id, &event.lease_id).await {
                    Ok(true) => {}
                    Ok(false) => warn!(event_id = event.id, "ack was a no-op (lease already moved on)"),
                    Err(report) => warn!(event_id = event.id, error = ?report, "failed to ack processed event"),
                }
            }
            Err(report) => {
                let mut attempts = self.attempts.entry(key).or_insert(0);
                *attempts += 1;
                if *attempts >= self.config.max_attempts {
                    warn!(event_id = event.id, attempts = *attempts, error = ?report, "poison event moved to dead-letter");
                    let chain = format!("{report:?}");
                    if let Err(dl_err) = self
                        .dead_letters
                        .record(&event.payload, i64::from(*attempts), &chain)
                        .await
                    {
                        warn!(event_id = event.id, error = ?dl_err, "failed to record dead-lettered event");
                    }
                    drop(attempts);
                    self.attempts.remove(&key);
                    let _ = self.queue.ack(event.id, &event.lease_id).await;
                } else {
                    info!(event_id = event.id, attempts = *attempts, error = ?report, "refresh failed, leaving lease to expire");
                }
            }
        }
    }

    async fn worker_loop(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        loop {
            if *stop.borrow() {
                return;
            }
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        return;
                    }
                }
                leased = self.queue.lease_batch(self.config.batch_size, self.config.lease_duration) => {
                    match leased {
                        Ok(batch) if batch.is_empty() => {
                            tokio::time::sleep(StdDuration::from_millis(200)).await;
                        }
                        Ok(batch) => {
                            for event in batch {
                                self.process_event(event).await;
                            }
                        }
                        Err(report) => {
                            warn!(error = ?report, "lease_batch failed");
                            tokio::time::sleep(StdDuration::from_millis(500)).await;
                        }
                    }
                }
            }
        }
    }

    /// Runs `worker_count` worker loops until `stop` is set, then waits for
    /// in-flight refreshes to finish (spec.md §5: "In-flight refreshes
    /// complete or roll back; leases expire naturally.").
    pub async fn run(self: Arc<Self>, stop: watch::Receiver<bool>) {
        let mut workers = JoinSet::new();
        for _ in 0..self.config.worker_count {
            let scheduler = Arc::clone(&self);
            let stop = stop.clone();
            workers.spawn(scheduler.worker_loop(stop));
        }
        while workers.join_next().await.is_some() {}
    }
}
