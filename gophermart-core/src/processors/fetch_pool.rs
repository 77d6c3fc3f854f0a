//! FetchPool processor.
//!
//! A fixed number of `FetchWorker`s share the bounded queue filled by the
//! scheduler. Each worker:
//! - takes one `PendingOrder` at a time
//! - asks the accrual service about it
//! - forwards `AccrualResolved` to the ledger writer
//! - pauses itself when the service rate limits it
//!
//! Anything not forwarded stays non-final in storage and comes back with the
//! next scan.

use super::stop_requested;
use crate::accrual::{AccrualLookup, LookupOutcome};
use crate::config::EngineConfig;
use crate::events::{AccrualResolvedSender, PendingOrder, PendingOrderReceiver};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub struct FetchPool {
    lookup: Arc<dyn AccrualLookup>,
    workers: usize,
    rate_limit_pause: Duration,
    max_rate_limit_pause: Duration,
}

impl FetchPool {
    pub fn new(lookup: Arc<dyn AccrualLookup>, config: &EngineConfig) -> Self {
        Self {
            lookup,
            workers: config.workers.max(1),
            rate_limit_pause: config.rate_limit_pause,
            max_rate_limit_pause: config.max_rate_limit_pause,
        }
    }

    /// Spawn the workers. The pool keeps no sender of its own, so the result
    /// channel closes once the last worker stops.
    pub fn spawn(
        self,
        order_rx: PendingOrderReceiver,
        result_tx: AccrualResolvedSender,
        shutdown_rx: watch::Receiver<bool>,
    ) -> JoinSet<()> {
        let queue = Arc::new(Mutex::new(order_rx));
        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            let worker = FetchWorker {
                id,
                lookup: self.lookup.clone(),
                queue: queue.clone(),
                result_tx: result_tx.clone(),
                shutdown_rx: shutdown_rx.clone(),
                rate_limit_pause: self.rate_limit_pause,
                max_rate_limit_pause: self.max_rate_limit_pause,
            };
            workers.spawn(worker.run());
        }
        info!(workers = self.workers, "FetchPool started");
        workers
    }
}

pub struct FetchWorker {
    id: usize,
    lookup: Arc<dyn AccrualLookup>,
    queue: Arc<Mutex<PendingOrderReceiver>>,
    result_tx: AccrualResolvedSender,
    shutdown_rx: watch::Receiver<bool>,
    rate_limit_pause: Duration,
    max_rate_limit_pause: Duration,
}

impl FetchWorker {
    /// Pause after a 429: the service's hint if it gave one, capped.
    fn pause_for(&self, retry_after: Option<Duration>) -> Duration {
        retry_after
            .unwrap_or(self.rate_limit_pause)
            .min(self.max_rate_limit_pause)
    }

    /// Work until shutdown, until the queue is closed and empty, or until the
    /// ledger writer is gone. A lookup already started is always finished and
    /// its result forwarded.
    pub async fn run(mut self) {
        let worker = self.id;
        loop {
            let next = tokio::select! {
                biased;
                _ = stop_requested(&mut self.shutdown_rx) => None,
                order = next_order(&self.queue) => order,
            };
            let Some(PendingOrder { number }) = next else {
                break;
            };

            match self.lookup.lookup(&number).await {
                Ok(LookupOutcome::Resolved(resolved)) => {
                    debug!(worker, order = %number, status = ?resolved.status, "Accrual resolved");
                    if self.result_tx.send(resolved).await.is_err() {
                        warn!(worker, "Ledger writer is gone, stopping worker");
                        break;
                    }
                }
                Ok(LookupOutcome::NotRegistered) => {
                    debug!(worker, order = %number, "Order not registered in accrual service yet");
                }
                Ok(LookupOutcome::RateLimited { retry_after }) => {
                    let pause = self.pause_for(retry_after);
                    warn!(worker, order = %number, ?pause, "Rate limited by accrual service, pausing");
                    tokio::select! {
                        biased;
                        _ = stop_requested(&mut self.shutdown_rx) => break,
                        _ = tokio::time::sleep(pause) => {}
                    }
                }
                Err(e) if e.is_transient() => {
                    warn!(worker, order = %number, error = %e, "Accrual lookup failed, will retry");
                }
                Err(e) => {
                    error!(worker, order = %number, error = %e, "Accrual service broke its contract");
                }
            }
        }
        debug!(worker, "FetchWorker stopped");
    }
}

async fn next_order(queue: &Mutex<PendingOrderReceiver>) -> Option<PendingOrder> {
    queue.lock().await.recv().await
}
