//! Persistence seam of the loyalty service.
//!
//! [`BonusStore`] is everything the HTTP layer and the refresh engine need
//! from storage. [`PgStore`] is the production backend; [`MemoryStore`]
//! keeps the same guarantees in process and backs tests and database-less
//! local runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::entities::{Balance, OrderRecord, SpendingRecord, UserId, UserRecord};
use crate::events::AccrualResolved;
use crate::utils::{luhn, money};
use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Data that the schema should have made impossible
    #[error("inconsistent storage state: {0}")]
    Inconsistent(String),
}

/// What happened to an order upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// New order, now waiting for its accrual.
    Accepted,
    /// The same user uploaded this number before.
    AlreadyUploaded,
    /// Another user owns this number.
    OwnedByAnother,
}

/// Counters of one batch written by the ledger writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApplyReport {
    /// Orders whose status moved forward.
    pub updated: usize,
    /// Ledger credits written, at most one per order ever.
    pub credited: usize,
    /// Results dropped: unknown order, already final, or nothing new.
    pub skipped: usize,
}

/// A validated withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Withdrawal {
    reference: String,
    amount: Decimal,
}

impl Withdrawal {
    /// The reference must pass the Luhn check and the amount, rounded to
    /// cents, must be positive.
    pub fn new(reference: impl Into<String>, amount: Decimal) -> Result<Self, WithdrawError> {
        let reference = reference.into();
        if !luhn::is_valid(&reference) {
            return Err(WithdrawError::InvalidReference);
        }
        let amount = money::normalize(amount);
        if amount <= Decimal::ZERO {
            return Err(WithdrawError::NonPositiveAmount);
        }
        Ok(Self { reference, amount })
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }
}

#[derive(Debug, Error)]
pub enum WithdrawError {
    #[error("order reference fails the Luhn check")]
    InvalidReference,

    #[error("withdrawal amount must be positive")]
    NonPositiveAmount,

    #[error("insufficient funds: {available} available, {requested} requested")]
    InsufficientFunds {
        available: Decimal,
        requested: Decimal,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for WithdrawError {
    fn from(error: sqlx::Error) -> Self {
        WithdrawError::Store(StoreError::Database(error))
    }
}

#[async_trait]
pub trait BonusStore: Send + Sync {
    /// Register a login. `None` when it is taken.
    async fn create_user(&self, login: &str, password_hash: &str)
        -> Result<Option<UserId>, StoreError>;

    async fn find_user(&self, login: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Record an uploaded order number. The caller has already validated it.
    async fn upload_order(&self, owner: UserId, number: &str) -> Result<UploadOutcome, StoreError>;

    /// Orders of one user, newest first.
    async fn orders_of(&self, owner: UserId) -> Result<Vec<OrderRecord>, StoreError>;

    /// Numbers of all orders still in `NEW` or `PROCESSING`, oldest first.
    async fn pending_order_numbers(&self) -> Result<Vec<String>, StoreError>;

    /// Apply lookup results atomically: move orders forward and credit each
    /// order reaching `PROCESSED` exactly once. Results for unknown or final
    /// orders are skipped.
    async fn apply_accruals(&self, results: &[AccrualResolved]) -> Result<ApplyReport, StoreError>;

    async fn balance(&self, owner: UserId) -> Result<Balance, StoreError>;

    /// Spend from the balance. Concurrent withdrawals of one user are
    /// serialized and the balance never goes below zero.
    async fn withdraw(
        &self,
        owner: UserId,
        withdrawal: &Withdrawal,
    ) -> Result<SpendingRecord, WithdrawError>;

    /// Withdrawals of one user, newest first.
    async fn withdrawals_of(&self, owner: UserId) -> Result<Vec<SpendingRecord>, StoreError>;
}
