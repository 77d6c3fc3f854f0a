//! Response body of the external accrual service.
//!
//! `GET {accrual}/api/orders/{number}` answers `200` with this body once the
//! service knows the order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order status as reported by the accrual service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccrualStatus {
    /// Registered, calculation not started yet.
    Registered,
    /// Calculation in progress.
    Processing,
    /// The order earns nothing and never will.
    Invalid,
    /// Calculation finished, `accrual` holds the reward.
    Processed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub accrual: Option<Decimal>,
}
