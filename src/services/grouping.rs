//! Grouping run driver.
//!
//! A run loads the batches that still have stock, fills one group at a time
//! with the allocation engine and commits every group together with its batch
//! mutations before the next pass. Nothing survives between runs except the
//! persisted rows.

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

use crate::allocation::{AllocationEngine, BatchPool, PoolBatch};
use crate::entities::BatchStatus;
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::repositories::{AllocationStore, GroupRecord};

/// Source of timestamps for new groups.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Outcome of one grouping run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RunSummary {
    /// Groups persisted by this run
    pub groups_created: usize,
    /// Batches whose stock was fully allocated by this run
    pub batches_exhausted: usize,
    /// Batches closed without allocation because their price is not positive
    pub unallocatable_batches: usize,
    /// The run stopped early because shutdown was requested
    pub cancelled: bool,
}

/// Runs the allocation engine against a store, one committed group at a time.
///
/// At most one run per service instance is active; clones share the guard.
#[derive(Clone)]
pub struct GroupingService {
    store: Arc<dyn AllocationStore>,
    engine: AllocationEngine,
    clock: Arc<dyn Clock>,
    run_guard: Arc<Mutex<()>>,
    event_sender: Option<EventSender>,
}

impl GroupingService {
    pub fn new(store: Arc<dyn AllocationStore>) -> Self {
        Self {
            store,
            engine: AllocationEngine::default(),
            clock: Arc::new(SystemClock),
            run_guard: Arc::new(Mutex::new(())),
            event_sender: None,
        }
    }

    pub fn with_engine(mut self, engine: AllocationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_sender(mut self, sender: EventSender) -> Self {
        self.event_sender = Some(sender);
        self
    }

    /// Whether a run is currently in progress.
    pub fn is_running(&self) -> bool {
        self.run_guard.try_lock().is_err()
    }

    /// Runs allocation until the pool is drained, nothing more fits, or
    /// `cancel` fires. Cancellation is only observed between groups.
    ///
    /// # Errors
    /// `Conflict` when another run is in progress. Any persistence error
    /// aborts the run; groups committed before it stay committed.
    #[instrument(skip(self, cancel))]
    pub async fn run_allocation(
        &self,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, ServiceError> {
        let _guard = self.run_guard.try_lock().map_err(|_| {
            ServiceError::Conflict("A grouping run is already in progress".to_string())
        })?;

        let started = Instant::now();
        counter!("grouping.runs", 1);
        let result = self.run_exclusive(cancel).await;
        histogram!("grouping.run.duration", started.elapsed());

        match &result {
            Ok(summary) => {
                info!(
                    groups_created = summary.groups_created,
                    batches_exhausted = summary.batches_exhausted,
                    unallocatable_batches = summary.unallocatable_batches,
                    cancelled = summary.cancelled,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Grouping run finished"
                );
                self.emit(Event::GroupingRunCompleted {
                    groups_created: summary.groups_created,
                    batches_exhausted: summary.batches_exhausted,
                    cancelled: summary.cancelled,
                })
                .await;
            }
            Err(e) => {
                counter!("grouping.run.failures", 1);
                error!(error = %e, "Grouping run failed");
            }
        }

        result
    }

    async fn run_exclusive(&self, cancel: &CancellationToken) -> Result<RunSummary, ServiceError> {
        let mut summary = RunSummary::default();

        let batches = self.store.available_batches().await?;
        let mut pool = BatchPool::new(batches.iter().map(PoolBatch::from));
        if pool.is_empty() {
            debug!("No batches available for grouping");
            return Ok(summary);
        }

        info!(
            pool_size = pool.len(),
            pool_value = %pool.total_value(),
            "Starting grouping run"
        );
        let mut sequence = self.store.next_group_sequence().await?;

        while pool.has_remaining() {
            if cancel.is_cancelled() {
                info!(
                    groups_created = summary.groups_created,
                    "Grouping run cancelled, leaving remaining stock for the next run"
                );
                summary.cancelled = true;
                break;
            }

            let outcome = self.engine.fill_group(&mut pool);
            if outcome.group.is_empty() {
                let exhausted = self.engine.exhaust_unallocatable(&mut pool);
                if !exhausted.is_empty() {
                    self.store
                        .commit_batch_changes(&exhausted, self.clock.now())
                        .await?;
                    info!(
                        count = exhausted.len(),
                        "Marked batches without a positive price as processed"
                    );
                    summary.unallocatable_batches = exhausted.len();
                }
                break;
            }

            let record = GroupRecord::from_draft(&outcome.group, sequence, self.clock.now());
            if let Err(e) = self.store.commit_group(&record, &outcome.changes).await {
                error!(
                    group = %record.group.name,
                    groups_committed = summary.groups_created,
                    error = %e,
                    "Failed to persist group, aborting run"
                );
                return Err(e);
            }

            sequence += 1;
            summary.groups_created += 1;
            summary.batches_exhausted += outcome
                .changes
                .iter()
                .filter(|change| change.status == BatchStatus::Processed)
                .count();
            counter!("grouping.groups_created", 1);
            debug!(
                group = %record.group.name,
                items = record.items.len(),
                total_price = %record.group.total_price,
                "Group committed"
            );

            self.emit(Event::GroupCreated {
                group_id: record.group.id,
                name: record.group.name.clone(),
                total_price: record.group.total_price,
                item_count: record.items.len(),
            })
            .await;
        }

        Ok(summary)
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "Failed to publish grouping event");
            }
        }
    }
}
