use super::{
    ApplyReport, BonusStore, StoreError, UploadOutcome, WithdrawError, Withdrawal,
};
use crate::entities::orders::{
    GetOrderOwner, GetOrdersByOwner, GetPendingOrderNumbers, InsertOrder,
};
use crate::entities::spending::GetSpendingsByOwner;
use crate::entities::users::{CreateUser, GetUserByLogin};
use crate::entities::{
    Balance, LedgerEntry, LockedOrder, OrderRecord, OrderStatus, SpendingRecord, UserId,
    UserRecord,
};
use crate::events::AccrualResolved;
use crate::framework::DatabaseProcessor;
use async_trait::async_trait;
use gophermart_sdk::objects::AccrualStatus;
use kanau::processor::Processor;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::debug;

/// PostgreSQL backend. Every multi-row change runs in one transaction.
#[derive(Clone)]
pub struct PgStore {
    db: DatabaseProcessor,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            db: DatabaseProcessor { pool },
        }
    }

    /// Bring the schema up to date.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("../migrations").run(&self.db.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.db.pool
    }
}

#[async_trait]
impl BonusStore for PgStore {
    async fn create_user(
        &self,
        login: &str,
        password_hash: &str,
    ) -> Result<Option<UserId>, StoreError> {
        Ok(self
            .db
            .process(CreateUser {
                login: login.to_string(),
                password_hash: password_hash.to_string(),
            })
            .await?)
    }

    async fn find_user(&self, login: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(self
            .db
            .process(GetUserByLogin {
                login: login.to_string(),
            })
            .await?)
    }

    async fn upload_order(&self, owner: UserId, number: &str) -> Result<UploadOutcome, StoreError> {
        let inserted = self
            .db
            .process(InsertOrder {
                number: number.to_string(),
                owner_id: owner,
            })
            .await?;
        if inserted {
            return Ok(UploadOutcome::Accepted);
        }
        // Orders are never deleted, so a conflicting row is still there.
        let existing = self
            .db
            .process(GetOrderOwner {
                number: number.to_string(),
            })
            .await?;
        match existing {
            Some(existing) if existing == owner => Ok(UploadOutcome::AlreadyUploaded),
            Some(_) => Ok(UploadOutcome::OwnedByAnother),
            None => Err(StoreError::Inconsistent(format!(
                "order {number} conflicted on insert but does not exist"
            ))),
        }
    }

    async fn orders_of(&self, owner: UserId) -> Result<Vec<OrderRecord>, StoreError> {
        Ok(self.db.process(GetOrdersByOwner { owner_id: owner }).await?)
    }

    async fn pending_order_numbers(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.db.process(GetPendingOrderNumbers).await?)
    }

    async fn apply_accruals(&self, results: &[AccrualResolved]) -> Result<ApplyReport, StoreError> {
        let mut report = ApplyReport::default();
        if results.is_empty() {
            return Ok(report);
        }

        let mut numbers: Vec<String> = results.iter().map(|r| r.number.clone()).collect();
        numbers.sort_unstable();
        numbers.dedup();

        let mut tx = self.db.pool.begin().await?;
        let locked = OrderRecord::lock_for_update_tx(&mut tx, &numbers).await?;
        let mut orders: HashMap<String, LockedOrder> = locked
            .into_iter()
            .map(|order| (order.number.clone(), order))
            .collect();

        for result in results {
            let Some(order) = orders.get_mut(&result.number) else {
                debug!(order = %result.number, "Accrual result for unknown order, skipping");
                report.skipped += 1;
                continue;
            };
            let Some(next) = order.status.after_accrual(result.status) else {
                report.skipped += 1;
                continue;
            };
            let accrual = (result.status == AccrualStatus::Processed).then_some(result.accrual);
            if !OrderRecord::update_accrual_tx(&mut tx, &order.number, next, accrual).await? {
                report.skipped += 1;
                continue;
            }
            report.updated += 1;
            if next == OrderStatus::Processed
                && LedgerEntry::credit_tx(&mut tx, order.owner_id, &order.number, result.accrual)
                    .await?
            {
                report.credited += 1;
            }
            // later results in this batch see the new status
            order.status = next;
        }

        tx.commit().await?;
        Ok(report)
    }

    async fn balance(&self, owner: UserId) -> Result<Balance, StoreError> {
        let mut db = self.db.clone();
        Ok(Balance::fetch(&mut db, owner).await?)
    }

    async fn withdraw(
        &self,
        owner: UserId,
        withdrawal: &Withdrawal,
    ) -> Result<SpendingRecord, WithdrawError> {
        let mut txp = self.db.begin().await?;
        if !UserRecord::lock_tx(&mut txp.tx, owner).await? {
            return Err(StoreError::Inconsistent(format!("user {owner} does not exist")).into());
        }
        let balance = Balance::fetch(&mut txp, owner).await?;
        if balance.current < withdrawal.amount() {
            return Err(WithdrawError::InsufficientFunds {
                available: balance.current,
                requested: withdrawal.amount(),
            });
        }
        let spending = SpendingRecord::insert_tx(
            &mut txp.tx,
            owner,
            withdrawal.reference(),
            withdrawal.amount(),
        )
        .await?;
        LedgerEntry::debit_tx(&mut txp.tx, owner, spending.id, spending.amount).await?;
        txp.commit().await?;
        Ok(spending)
    }

    async fn withdrawals_of(&self, owner: UserId) -> Result<Vec<SpendingRecord>, StoreError> {
        Ok(self.db.process(GetSpendingsByOwner { owner_id: owner }).await?)
    }
}
