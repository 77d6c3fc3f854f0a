//! Messages flowing through the accrual refresh pipeline.
//!
//! # Event Flow
//!
//! 1. `AccrualScheduler` emits `PendingOrder` -> `FetchPool`
//! 2. a `FetchWorker` asks the accrual service and emits `AccrualResolved` -> `LedgerUpdater`
//! 3. `LedgerUpdater` moves the order forward and credits the ledger
//!
//! Events carry order numbers, not rows. The updater re-reads and locks the
//! order before acting, so a duplicate or stale event is harmless.

pub mod channels;
pub mod types;

pub use channels::{
    accrual_resolved_channel, pending_order_channel, AccrualResolvedReceiver,
    AccrualResolvedSender, PendingOrderReceiver, PendingOrderSender, DEFAULT_CHANNEL_BUFFER,
};

pub use types::{AccrualResolved, PendingOrder};
