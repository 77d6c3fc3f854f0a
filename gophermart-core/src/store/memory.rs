use super::{
    ApplyReport, BonusStore, StoreError, UploadOutcome, WithdrawError, Withdrawal,
};
use crate::entities::{
    Balance, LedgerEntry, OrderRecord, OrderStatus, SpendingRecord, UserId, UserRecord,
};
use crate::events::AccrualResolved;
use async_trait::async_trait;
use gophermart_sdk::objects::AccrualStatus;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct Tables {
    users: Vec<UserRecord>,
    orders: Vec<OrderRecord>,
    spending: Vec<SpendingRecord>,
    ledger: Vec<LedgerEntry>,
    next_user_id: i64,
    next_spending_id: i64,
    next_entry_id: i64,
}

impl Tables {
    fn balance(&self, owner: UserId) -> Result<Balance, StoreError> {
        let mut credited = Decimal::ZERO;
        let mut debited = Decimal::ZERO;
        let overflow = || StoreError::Inconsistent(format!("balance of user {owner} overflows"));
        for entry in self.ledger.iter().filter(|entry| entry.owner_id == owner) {
            credited = credited.checked_add(entry.credited).ok_or_else(overflow)?;
            debited = debited.checked_add(entry.debited).ok_or_else(overflow)?;
        }
        Ok(Balance {
            current: credited - debited,
            withdrawn: debited,
        })
    }

    fn push_entry(
        &mut self,
        owner_id: UserId,
        order_number: Option<String>,
        spending_id: Option<i64>,
        credited: Decimal,
        debited: Decimal,
    ) {
        self.next_entry_id += 1;
        self.ledger.push(LedgerEntry {
            id: self.next_entry_id,
            owner_id,
            order_number,
            spending_id,
            credited,
            debited,
            created_at: OffsetDateTime::now_utc(),
        });
    }
}

/// In-process backend with the same guarantees as [`super::PgStore`].
///
/// One lock covers all tables, so every operation is trivially atomic and
/// withdrawals are serialized. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current status and accrual of an order, if it exists.
    pub async fn order(&self, number: &str) -> Option<OrderRecord> {
        let tables = self.tables.lock().await;
        tables.orders.iter().find(|o| o.number == number).cloned()
    }

    /// Number of ledger credits recorded for an order.
    pub async fn credit_count(&self, number: &str) -> usize {
        let tables = self.tables.lock().await;
        tables
            .ledger
            .iter()
            .filter(|entry| entry.order_number.as_deref() == Some(number))
            .count()
    }
}

#[async_trait]
impl BonusStore for MemoryStore {
    async fn create_user(
        &self,
        login: &str,
        password_hash: &str,
    ) -> Result<Option<UserId>, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|u| u.login == login) {
            return Ok(None);
        }
        tables.next_user_id += 1;
        let id = UserId(tables.next_user_id);
        tables.users.push(UserRecord {
            id,
            login: login.to_string(),
            password_hash: password_hash.to_string(),
            created_at: OffsetDateTime::now_utc(),
        });
        Ok(Some(id))
    }

    async fn find_user(&self, login: &str) -> Result<Option<UserRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.login == login).cloned())
    }

    async fn upload_order(&self, owner: UserId, number: &str) -> Result<UploadOutcome, StoreError> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.orders.iter().find(|o| o.number == number) {
            return Ok(if existing.owner_id == owner {
                UploadOutcome::AlreadyUploaded
            } else {
                UploadOutcome::OwnedByAnother
            });
        }
        tables.orders.push(OrderRecord {
            number: number.to_string(),
            owner_id: owner,
            status: OrderStatus::New,
            accrual: None,
            uploaded_at: OffsetDateTime::now_utc(),
        });
        Ok(UploadOutcome::Accepted)
    }

    async fn orders_of(&self, owner: UserId) -> Result<Vec<OrderRecord>, StoreError> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<OrderRecord> = tables
            .orders
            .iter()
            .rev()
            .filter(|o| o.owner_id == owner)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(orders)
    }

    async fn pending_order_numbers(&self) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .filter(|o| !o.status.is_terminal())
            .map(|o| o.number.clone())
            .collect())
    }

    async fn apply_accruals(&self, results: &[AccrualResolved]) -> Result<ApplyReport, StoreError> {
        let mut tables = self.tables.lock().await;
        let mut report = ApplyReport::default();
        for result in results {
            let Some(index) = tables.orders.iter().position(|o| o.number == result.number) else {
                report.skipped += 1;
                continue;
            };
            let order = &mut tables.orders[index];
            let Some(next) = order.status.after_accrual(result.status) else {
                report.skipped += 1;
                continue;
            };
            order.status = next;
            order.accrual = (result.status == AccrualStatus::Processed).then_some(result.accrual);
            report.updated += 1;

            if next == OrderStatus::Processed {
                let owner = order.owner_id;
                let number = order.number.clone();
                let already = tables
                    .ledger
                    .iter()
                    .any(|entry| entry.order_number.as_deref() == Some(number.as_str()));
                if !already {
                    tables.push_entry(owner, Some(number), None, result.accrual, Decimal::ZERO);
                    report.credited += 1;
                }
            }
        }
        Ok(report)
    }

    async fn balance(&self, owner: UserId) -> Result<Balance, StoreError> {
        let tables = self.tables.lock().await;
        tables.balance(owner)
    }

    async fn withdraw(
        &self,
        owner: UserId,
        withdrawal: &Withdrawal,
    ) -> Result<SpendingRecord, WithdrawError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.iter().any(|u| u.id == owner) {
            return Err(StoreError::Inconsistent(format!("user {owner} does not exist")).into());
        }
        let balance = tables.balance(owner)?;
        if balance.current < withdrawal.amount() {
            return Err(WithdrawError::InsufficientFunds {
                available: balance.current,
                requested: withdrawal.amount(),
            });
        }
        tables.next_spending_id += 1;
        let spending = SpendingRecord {
            id: tables.next_spending_id,
            owner_id: owner,
            order_reference: withdrawal.reference().to_string(),
            amount: withdrawal.amount(),
            processed_at: OffsetDateTime::now_utc(),
        };
        tables.spending.push(spending.clone());
        tables.push_entry(owner, None, Some(spending.id), Decimal::ZERO, spending.amount);
        Ok(spending)
    }

    async fn withdrawals_of(&self, owner: UserId) -> Result<Vec<SpendingRecord>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .spending
            .iter()
            .rev()
            .filter(|s| s.owner_id == owner)
            .cloned()
            .collect())
    }
}
