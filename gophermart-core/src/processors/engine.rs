//! AccrualEngine supervisor.
//!
//! Owns the pipeline: creates the bounded channels, spawns the scheduler, the
//! fetch pool and the ledger writer, and keeps a private stop flag for them.
//!
//! Shutdown order is scheduler first, then the workers (each finishing its
//! in-flight lookup), then the ledger writer once the result channel is empty.
//! The same order is used when a stage fails; the first failure is returned.

use super::{
    AccrualScheduler, FetchPool, LedgerUpdater, SchedulerError, UpdaterError, stop_requested,
};
use crate::accrual::AccrualLookup;
use crate::config::EngineConfig;
use crate::events::{accrual_resolved_channel, pending_order_channel};
use crate::store::BonusStore;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinError;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("scheduler stopped: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("ledger updater stopped: {0}")]
    Updater(#[from] UpdaterError),

    #[error("engine task failed: {0}")]
    Task(#[from] JoinError),
}

pub struct AccrualEngine {
    store: Arc<dyn BonusStore>,
    lookup: Arc<dyn AccrualLookup>,
    config: EngineConfig,
}

/// Keep the first error seen.
fn record<E: Into<EngineError>>(
    first: &mut Option<EngineError>,
    joined: Result<Result<(), E>, JoinError>,
) {
    let error = match joined {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e.into(),
        Err(e) => EngineError::Task(e),
    };
    error!(error = %error, "Accrual engine stage failed");
    first.get_or_insert(error);
}

impl AccrualEngine {
    pub fn new(
        store: Arc<dyn BonusStore>,
        lookup: Arc<dyn AccrualLookup>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            lookup,
            config: config.sanitized(),
        }
    }

    /// Run the pipeline until `shutdown_rx` turns true or a stage fails.
    ///
    /// Returns only after every stage has stopped.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<(), EngineError> {
        let config = self.config;
        let (stop_tx, stop_rx) = watch::channel(false);
        let (order_tx, order_rx) = pending_order_channel(config.queue_capacity);
        let (result_tx, result_rx) = accrual_resolved_channel(config.queue_capacity);

        let scheduler = AccrualScheduler::new(self.store.clone(), order_tx, config.poll_interval);
        let mut scheduler_task = tokio::spawn(scheduler.run(stop_rx.clone()));
        let mut workers =
            FetchPool::new(self.lookup, &config).spawn(order_rx, result_tx, stop_rx.clone());
        let updater = LedgerUpdater::new(self.store, config.batch_size);
        let mut updater_task = tokio::spawn(updater.run(result_rx));
        info!(
            workers = config.workers,
            interval = ?config.poll_interval,
            "Accrual engine started"
        );

        let mut first_error = None;
        let mut scheduler_done = false;
        let mut updater_done = false;
        tokio::select! {
            _ = stop_requested(&mut shutdown_rx) => {
                info!("Accrual engine received shutdown signal");
            }
            joined = &mut scheduler_task => {
                scheduler_done = true;
                record(&mut first_error, joined);
            }
            joined = &mut updater_task => {
                updater_done = true;
                record(&mut first_error, joined);
            }
        }

        let _ = stop_tx.send(true);
        if !scheduler_done {
            record(&mut first_error, scheduler_task.await);
        }
        while let Some(joined) = workers.join_next().await {
            record::<EngineError>(&mut first_error, joined.map(Ok));
        }
        if !updater_done {
            record(&mut first_error, updater_task.await);
        }
        info!("Accrual engine stopped");

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Balance, OrderRecord, OrderStatus, SpendingRecord, UserId, UserRecord};
    use crate::events::AccrualResolved;
    use crate::accrual::LookupOutcome;
    use crate::processors::fakes::ScriptedLookup;
    use crate::store::{
        ApplyReport, MemoryStore, StoreError, UploadOutcome, WithdrawError, Withdrawal,
    };
    use async_trait::async_trait;
    use gophermart_sdk::objects::AccrualStatus;
    use rust_decimal::Decimal;
    use std::time::Duration;

    struct Harness {
        lookup: Arc<ScriptedLookup>,
        shutdown_tx: watch::Sender<bool>,
        engine: tokio::task::JoinHandle<Result<(), EngineError>>,
    }

    impl Harness {
        fn start(store: Arc<MemoryStore>, lookup: Arc<ScriptedLookup>) -> Self {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let engine = AccrualEngine::new(store.clone(), lookup.clone(), EngineConfig::default());
            let engine = tokio::spawn(engine.run(shutdown_rx));
            Self {
                lookup,
                shutdown_tx,
                engine,
            }
        }

        async fn stop(self) -> Result<(), EngineError> {
            self.shutdown_tx.send(true).unwrap();
            self.engine.await.unwrap()
        }
    }

    async fn ivan(store: &MemoryStore) -> UserId {
        store.create_user("ivan", "hash").await.unwrap().unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_accrue_withdraw_scenario() {
        let store = Arc::new(MemoryStore::new());
        let lookup = Arc::new(ScriptedLookup::new());
        let ivan = ivan(&store).await;
        // the core trusts its caller, number validation is the API's job
        store.upload_order(ivan, "1234567890").await.unwrap();
        lookup.push(
            "1234567890",
            ScriptedLookup::resolved("1234567890", AccrualStatus::Processed, 500),
        );

        let harness = Harness::start(store.clone(), lookup);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(
            store.balance(ivan).await.unwrap(),
            Balance {
                current: Decimal::from(500),
                withdrawn: Decimal::ZERO
            }
        );

        let withdrawal = Withdrawal::new("2377225624", Decimal::from(200)).unwrap();
        store.withdraw(ivan, &withdrawal).await.unwrap();
        assert_eq!(
            store.balance(ivan).await.unwrap(),
            Balance {
                current: Decimal::from(300),
                withdrawn: Decimal::from(200)
            }
        );
        let spendings = store.withdrawals_of(ivan).await.unwrap();
        assert_eq!(spendings.len(), 1);
        assert_eq!(spendings[0].order_reference, "2377225624");

        harness.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_final_orders_are_never_polled() {
        let store = Arc::new(MemoryStore::new());
        let lookup = Arc::new(ScriptedLookup::new());
        let ivan = ivan(&store).await;
        store.upload_order(ivan, "79927398713").await.unwrap();
        store.upload_order(ivan, "2377225624").await.unwrap();
        store
            .apply_accruals(&[
                AccrualResolved {
                    number: "79927398713".into(),
                    status: AccrualStatus::Processed,
                    accrual: Decimal::from(10),
                },
                AccrualResolved {
                    number: "2377225624".into(),
                    status: AccrualStatus::Invalid,
                    accrual: Decimal::ZERO,
                },
            ])
            .await
            .unwrap();

        let harness = Harness::start(store.clone(), lookup);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(harness.lookup.calls_for("79927398713").is_empty());
        assert!(harness.lookup.calls_for("2377225624").is_empty());
        assert_eq!(
            store.order("79927398713").await.unwrap().status,
            OrderStatus::Processed
        );
        harness.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_order_resolves_after_recovery() {
        let store = Arc::new(MemoryStore::new());
        let lookup = Arc::new(ScriptedLookup::new());
        let ivan = ivan(&store).await;
        store.upload_order(ivan, "79927398713").await.unwrap();
        for _ in 0..3 {
            lookup.push("79927398713", LookupOutcome::RateLimited { retry_after: None });
        }
        lookup.push(
            "79927398713",
            ScriptedLookup::resolved("79927398713", AccrualStatus::Processed, 42),
        );

        let harness = Harness::start(store.clone(), lookup);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(
            store.pending_order_numbers().await.unwrap(),
            vec!["79927398713".to_string()]
        );

        tokio::time::sleep(Duration::from_secs(30)).await;
        let order = store.order("79927398713").await.unwrap();
        assert_eq!(order.status, OrderStatus::Processed);
        assert_eq!(order.accrual, Some(Decimal::from(42)));
        assert_eq!(store.credit_count("79927398713").await, 1);
        assert!(harness.lookup.calls_for("79927398713").len() >= 4);
        harness.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_processed_answers_credit_once() {
        let store = Arc::new(MemoryStore::new());
        let lookup = Arc::new(ScriptedLookup::new());
        let ivan = ivan(&store).await;
        store.upload_order(ivan, "79927398713").await.unwrap();
        lookup.push(
            "79927398713",
            ScriptedLookup::resolved("79927398713", AccrualStatus::Processing, 0),
        );
        for _ in 0..5 {
            lookup.push(
                "79927398713",
                ScriptedLookup::resolved("79927398713", AccrualStatus::Processed, 75),
            );
        }

        let harness = Harness::start(store.clone(), lookup);
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(store.credit_count("79927398713").await, 1);
        assert_eq!(store.balance(ivan).await.unwrap().current, Decimal::from(75));
        harness.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_lookup_is_applied_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let lookup = Arc::new(ScriptedLookup::with_latency(Duration::from_secs(3)));
        let ivan = ivan(&store).await;
        store.upload_order(ivan, "79927398713").await.unwrap();
        lookup.push(
            "79927398713",
            ScriptedLookup::resolved("79927398713", AccrualStatus::Processed, 120),
        );

        let harness = Harness::start(store.clone(), lookup);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(harness.lookup.calls_for("79927398713").len(), 1);
        assert_eq!(
            store.order("79927398713").await.unwrap().status,
            OrderStatus::New
        );

        let lookup = harness.lookup.clone();
        harness.stop().await.unwrap();

        let order = store.order("79927398713").await.unwrap();
        assert_eq!(order.status, OrderStatus::Processed);
        assert_eq!(order.accrual, Some(Decimal::from(120)));
        assert_eq!(store.credit_count("79927398713").await, 1);
        assert_eq!(store.balance(ivan).await.unwrap().current, Decimal::from(120));
        assert_eq!(lookup.calls_for("79927398713").len(), 1);
    }

    /// Delegates to a `MemoryStore` but cannot list pending orders.
    struct BrokenScanStore(MemoryStore);

    #[async_trait]
    impl BonusStore for BrokenScanStore {
        async fn create_user(&self, login: &str, hash: &str) -> Result<Option<UserId>, StoreError> {
            self.0.create_user(login, hash).await
        }
        async fn find_user(&self, login: &str) -> Result<Option<UserRecord>, StoreError> {
            self.0.find_user(login).await
        }
        async fn upload_order(&self, owner: UserId, number: &str) -> Result<UploadOutcome, StoreError> {
            self.0.upload_order(owner, number).await
        }
        async fn orders_of(&self, owner: UserId) -> Result<Vec<OrderRecord>, StoreError> {
            self.0.orders_of(owner).await
        }
        async fn pending_order_numbers(&self) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Inconsistent("connection reset".into()))
        }
        async fn apply_accruals(&self, results: &[AccrualResolved]) -> Result<ApplyReport, StoreError> {
            self.0.apply_accruals(results).await
        }
        async fn balance(&self, owner: UserId) -> Result<Balance, StoreError> {
            self.0.balance(owner).await
        }
        async fn withdraw(
            &self,
            owner: UserId,
            withdrawal: &Withdrawal,
        ) -> Result<SpendingRecord, WithdrawError> {
            self.0.withdraw(owner, withdrawal).await
        }
        async fn withdrawals_of(&self, owner: UserId) -> Result<Vec<SpendingRecord>, StoreError> {
            self.0.withdrawals_of(owner).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_failure_stops_the_engine() {
        let store = Arc::new(BrokenScanStore(MemoryStore::new()));
        let lookup = Arc::new(ScriptedLookup::new());
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let engine = AccrualEngine::new(store, lookup, EngineConfig::default());

        let result = engine.run(shutdown_rx).await;
        assert!(matches!(
            result,
            Err(EngineError::Scheduler(SchedulerError::Storage(StoreError::Inconsistent(_))))
        ));
    }
}
