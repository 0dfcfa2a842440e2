use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::errors::ServiceError;
use crate::services::grouping::GroupingService;

/// Triggers a grouping run on a fixed interval until cancelled.
///
/// The first run happens one interval after start. Ticks missed while a run
/// is still busy are skipped rather than queued.
#[derive(Clone)]
pub struct GroupingScheduler {
    service: GroupingService,
    interval: Duration,
}

impl GroupingScheduler {
    pub fn new(service: GroupingService, interval: Duration) -> Self {
        Self { service, interval }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    pub async fn run(self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Grouping scheduler started"
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            match self.service.run_allocation(&cancel).await {
                Ok(summary) if summary.groups_created > 0 => {
                    debug!(groups_created = summary.groups_created, "Scheduled grouping run created groups");
                }
                Ok(_) => {}
                Err(ServiceError::Conflict(_)) => {
                    debug!("Skipping scheduled grouping run, another run is active");
                }
                Err(e) => {
                    error!(error = %e, "Scheduled grouping run failed");
                }
            }
        }

        info!("Grouping scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{product_batch, BatchStatus};
    use crate::repositories::InMemoryAllocationStore;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use uuid::Uuid;

    fn store() -> Arc<InMemoryAllocationStore> {
        Arc::new(InMemoryAllocationStore::new(vec![product_batch::Model {
            id: Uuid::from_u128(1),
            name: "Widget".into(),
            unit: "pcs".into(),
            unit_price: dec!(50),
            initial_quantity: 10,
            remaining_quantity: 10,
            status: BatchStatus::New,
            created_at: Utc::now(),
            updated_at: None,
        }]))
    }

    #[tokio::test(start_paused = true)]
    async fn runs_after_the_first_interval() {
        let store = store();
        let cancel = CancellationToken::new();
        let handle = GroupingScheduler::new(
            GroupingService::new(store.clone()),
            Duration::from_secs(60),
        )
        .spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(store.groups().is_empty());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(store.groups().len(), 3);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_cancelled_before_first_tick() {
        let store = store();
        let cancel = CancellationToken::new();
        let handle = GroupingScheduler::new(
            GroupingService::new(store.clone()),
            Duration::from_secs(300),
        )
        .spawn(cancel.clone());

        cancel.cancel();
        handle.await.unwrap();
        assert!(store.groups().is_empty());
    }
}
