//! Client side of the external accrual service.
//!
//! The engine only sees the [`AccrualLookup`] trait; [`HttpAccrualClient`] is
//! the production implementation, tests plug in scripted fakes.

mod http;

pub use http::HttpAccrualClient;

use crate::events::AccrualResolved;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Result of one lookup that reached the service and got an answer the
/// engine knows how to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The service knows the order.
    Resolved(AccrualResolved),
    /// The service has no record of the order yet. Asked again next scan.
    NotRegistered,
    /// Too many requests. The worker that got this answer pauses itself.
    RateLimited { retry_after: Option<Duration> },
}

#[derive(Debug, Error)]
pub enum AccrualError {
    /// Connection, timeout or body read failure
    #[error("accrual request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("accrual service answered with status {0}")]
    UnexpectedStatus(u16),

    #[error("malformed accrual response: {0}")]
    Malformed(String),

    #[error("accrual response is for order {got}, asked for {expected}")]
    OrderMismatch { expected: String, got: String },

    #[error("accrual service address cannot carry a path")]
    InvalidBaseUrl,
}

impl AccrualError {
    /// Whether asking again later may succeed. Permanent errors point at a
    /// broken service contract and are logged louder.
    pub fn is_transient(&self) -> bool {
        match self {
            AccrualError::Request(_) => true,
            AccrualError::UnexpectedStatus(code) => !(400..500).contains(code),
            AccrualError::Malformed(_)
            | AccrualError::OrderMismatch { .. }
            | AccrualError::InvalidBaseUrl => false,
        }
    }
}

/// Ask the accrual service about one order.
#[async_trait]
pub trait AccrualLookup: Send + Sync {
    async fn lookup(&self, number: &str) -> Result<LookupOutcome, AccrualError>;
}
