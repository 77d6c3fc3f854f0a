//! AccrualScheduler processor.
//!
//! Every `poll_interval` it reads the numbers of all orders that are not final
//! yet and pushes them into the fetch queue. The queue is bounded, so a slow
//! pool makes the scheduler wait instead of piling up work; ticks missed while
//! waiting are delayed, not replayed.

use super::stop_requested;
use crate::events::{PendingOrder, PendingOrderSender};
use crate::store::{BonusStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("failed to read pending orders: {0}")]
    Storage(#[from] StoreError),
}

pub struct AccrualScheduler {
    store: Arc<dyn BonusStore>,
    order_tx: PendingOrderSender,
    poll_interval: Duration,
}

impl AccrualScheduler {
    pub fn new(
        store: Arc<dyn BonusStore>,
        order_tx: PendingOrderSender,
        poll_interval: Duration,
    ) -> Self {
        Self {
            store,
            order_tx,
            poll_interval,
        }
    }

    /// Run until shutdown, until every worker is gone, or until storage fails.
    ///
    /// Returning drops the queue sender, which lets the workers finish.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), SchedulerError> {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval = ?self.poll_interval, "AccrualScheduler started");

        loop {
            tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown_rx) => {
                    info!("AccrualScheduler received shutdown signal");
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let numbers = match self.store.pending_order_numbers().await {
                Ok(numbers) => numbers,
                Err(e) => {
                    error!(error = %e, "Failed to read pending orders, stopping scheduler");
                    return Err(e.into());
                }
            };
            if numbers.is_empty() {
                continue;
            }
            debug!(count = numbers.len(), "Enqueueing pending orders");

            for number in numbers {
                tokio::select! {
                    biased;
                    _ = stop_requested(&mut shutdown_rx) => {
                        info!("AccrualScheduler received shutdown signal while enqueueing");
                        return Ok(());
                    }
                    sent = self.order_tx.send(PendingOrder { number }) => {
                        if sent.is_err() {
                            info!("Fetch queue closed, stopping scheduler");
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
