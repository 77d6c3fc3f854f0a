//! Stages of the accrual refresh pipeline.
//!
//! - `AccrualScheduler`: scans storage for pending orders, emits `PendingOrder`
//! - `FetchPool`: N `FetchWorker`s receive `PendingOrder`, emit `AccrualResolved`
//! - `LedgerUpdater`: receives `AccrualResolved`, writes statuses and credits
//! - `AccrualEngine`: wires the stages together and supervises them

pub mod engine;
pub mod fetch_pool;
pub mod ledger_updater;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod fakes;

pub use engine::{AccrualEngine, EngineError};
pub use fetch_pool::{FetchPool, FetchWorker};
pub use ledger_updater::{LedgerUpdater, UpdaterError};
pub use scheduler::{AccrualScheduler, SchedulerError};

use tokio::sync::watch;

/// Resolves once the stop flag is set. A dropped sender counts as stop too,
/// since nobody could ever clear it again.
pub(crate) async fn stop_requested(shutdown_rx: &mut watch::Receiver<bool>) {
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}
