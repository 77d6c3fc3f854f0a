use gophermart_sdk::objects::AccrualStatus;
use rust_decimal::Decimal;

/// An order the scheduler found in a non-final state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOrder {
    pub number: String,
}

/// What the accrual service currently says about an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualResolved {
    pub number: String,
    pub status: AccrualStatus,
    /// Already rounded to two digits; zero unless `status` is `Processed`.
    pub accrual: Decimal,
}
