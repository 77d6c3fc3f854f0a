//! LedgerUpdater processor.
//!
//! The only writer of order statuses and ledger credits. It takes whatever
//! results are already queued, up to `batch_size`, and hands them to storage
//! as one atomic batch. It does not watch the stop flag: it runs until the
//! result channel is closed and empty, so no forwarded result is lost on
//! shutdown.

use crate::events::AccrualResolvedReceiver;
use crate::store::{BonusStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum UpdaterError {
    #[error("failed to apply accrual batch: {0}")]
    Storage(#[from] StoreError),
}

pub struct LedgerUpdater {
    store: Arc<dyn BonusStore>,
    batch_size: usize,
}

impl LedgerUpdater {
    pub fn new(store: Arc<dyn BonusStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn run(self, mut result_rx: AccrualResolvedReceiver) -> Result<(), UpdaterError> {
        info!(batch_size = self.batch_size, "LedgerUpdater started");
        let mut batch = Vec::with_capacity(self.batch_size);
        loop {
            if result_rx.recv_many(&mut batch, self.batch_size).await == 0 {
                break;
            }
            let report = match self.store.apply_accruals(&batch).await {
                Ok(report) => report,
                Err(e) => {
                    error!(error = %e, size = batch.len(), "Failed to apply accrual batch, stopping updater");
                    return Err(e.into());
                }
            };
            if report.credited > 0 {
                info!(
                    updated = report.updated,
                    credited = report.credited,
                    skipped = report.skipped,
                    "Applied accrual batch"
                );
            } else {
                debug!(
                    updated = report.updated,
                    skipped = report.skipped,
                    "Applied accrual batch"
                );
            }
            batch.clear();
        }
        info!("Result channel drained, LedgerUpdater stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::OrderStatus;
    use crate::events::{AccrualResolved, accrual_resolved_channel};
    use crate::store::MemoryStore;
    use gophermart_sdk::objects::AccrualStatus;
    use rust_decimal::Decimal;

    fn resolved(number: &str, status: AccrualStatus, accrual: i64) -> AccrualResolved {
        AccrualResolved {
            number: number.to_string(),
            status,
            accrual: Decimal::from(accrual),
        }
    }

    #[tokio::test]
    async fn test_drains_channel_before_stopping() {
        let store = Arc::new(MemoryStore::new());
        let ivan = store.create_user("ivan", "hash").await.unwrap().unwrap();
        for number in ["79927398713", "2377225624", "12345678903"] {
            store.upload_order(ivan, number).await.unwrap();
        }

        let (result_tx, result_rx) = accrual_resolved_channel(8);
        for result in [
            resolved("79927398713", AccrualStatus::Processing, 0),
            resolved("79927398713", AccrualStatus::Processed, 120),
            resolved("2377225624", AccrualStatus::Invalid, 0),
            resolved("12345678903", AccrualStatus::Processed, 30),
            // duplicate after the transition, must not credit again
            resolved("12345678903", AccrualStatus::Processed, 30),
        ] {
            result_tx.send(result).await.unwrap();
        }
        drop(result_tx);

        LedgerUpdater::new(store.clone(), 2).run(result_rx).await.unwrap();

        let order = store.order("79927398713").await.unwrap();
        assert_eq!(order.status, OrderStatus::Processed);
        assert_eq!(order.accrual, Some(Decimal::from(120)));
        assert_eq!(
            store.order("2377225624").await.unwrap().status,
            OrderStatus::Invalid
        );
        assert_eq!(store.credit_count("12345678903").await, 1);
        assert_eq!(store.balance(ivan).await.unwrap().current, Decimal::from(150));
        assert!(store.pending_order_numbers().await.unwrap().is_empty());
    }
}
