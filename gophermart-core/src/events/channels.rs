//! Channel factories for the refresh pipeline.

use super::types::{AccrualResolved, PendingOrder};
use tokio::sync::mpsc;

/// Default buffer size for pipeline channels.
pub const DEFAULT_CHANNEL_BUFFER: usize = 256;

/// Sender handle for orders waiting for a lookup.
pub type PendingOrderSender = mpsc::Sender<PendingOrder>;
/// Receiver handle for orders waiting for a lookup.
pub type PendingOrderReceiver = mpsc::Receiver<PendingOrder>;

/// Sender handle for lookup results.
pub type AccrualResolvedSender = mpsc::Sender<AccrualResolved>;
/// Receiver handle for lookup results.
pub type AccrualResolvedReceiver = mpsc::Receiver<AccrualResolved>;

/// Create the bounded queue between the scheduler and the fetch workers.
///
/// When it is full the scheduler waits, which is the pipeline's backpressure.
pub fn pending_order_channel(capacity: usize) -> (PendingOrderSender, PendingOrderReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Create the result channel between the fetch workers and the ledger writer.
pub fn accrual_resolved_channel(
    capacity: usize,
) -> (AccrualResolvedSender, AccrualResolvedReceiver) {
    mpsc::channel(capacity.max(1))
}
