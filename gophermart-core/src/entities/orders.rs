use crate::entities::UserId;
use crate::framework::DatabaseProcessor;
use gophermart_sdk::objects::{AccrualStatus, OrderStatus as ApiOrderStatus};
use kanau::processor::Processor;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "UPPERCASE")]
pub enum OrderStatus {
    New,
    Processing,
    Invalid,
    Processed,
}

impl OrderStatus {
    /// `Invalid` and `Processed` never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Invalid | OrderStatus::Processed)
    }

    /// The status an order moves to after the accrual service reported
    /// `reported`, or `None` when the order must stay as it is.
    ///
    /// The accrual service's `REGISTERED` means it knows the order but has
    /// not started on it; for the user that is already `PROCESSING`.
    pub fn after_accrual(self, reported: AccrualStatus) -> Option<OrderStatus> {
        if self.is_terminal() {
            return None;
        }
        let next = match reported {
            AccrualStatus::Registered | AccrualStatus::Processing => OrderStatus::Processing,
            AccrualStatus::Invalid => OrderStatus::Invalid,
            AccrualStatus::Processed => OrderStatus::Processed,
        };
        (next != self).then_some(next)
    }
}

impl From<OrderStatus> for ApiOrderStatus {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::New => ApiOrderStatus::New,
            OrderStatus::Processing => ApiOrderStatus::Processing,
            OrderStatus::Invalid => ApiOrderStatus::Invalid,
            OrderStatus::Processed => ApiOrderStatus::Processed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderRecord {
    pub number: String,
    pub owner_id: UserId,
    pub status: OrderStatus,
    pub accrual: Option<Decimal>,
    pub uploaded_at: time::OffsetDateTime,
}

/// The part of an order row the ledger writer needs while it holds the lock.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LockedOrder {
    pub number: String,
    pub owner_id: UserId,
    pub status: OrderStatus,
}

impl OrderRecord {
    /// Lock the given orders in a stable order so concurrent writers cannot
    /// deadlock. Unknown numbers are simply absent from the result.
    pub async fn lock_for_update_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        numbers: &[String],
    ) -> Result<Vec<LockedOrder>, sqlx::Error> {
        sqlx::query_as::<_, LockedOrder>(
            r#"
            SELECT number, owner_id, status
            FROM orders
            WHERE number = ANY($1)
            ORDER BY number
            FOR UPDATE
            "#,
        )
        .bind(numbers)
        .fetch_all(&mut **tx)
        .await
    }

    /// Move an order forward. Returns `false` if the row was already final.
    pub async fn update_accrual_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        number: &str,
        status: OrderStatus,
        accrual: Option<Decimal>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, accrual = $3
            WHERE number = $1 AND status NOT IN ('INVALID', 'PROCESSED')
            "#,
        )
        .bind(number)
        .bind(status)
        .bind(accrual)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

#[derive(Debug, Clone)]
/// Insert a freshly uploaded order. Yields `false` if the number exists.
pub struct InsertOrder {
    pub number: String,
    pub owner_id: UserId,
}

impl Processor<InsertOrder> for DatabaseProcessor {
    type Output = bool;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertOrder")]
    async fn process(&self, insert: InsertOrder) -> Result<bool, sqlx::Error> {
        let inserted = sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO orders (number, owner_id, status)
            VALUES ($1, $2, 'NEW')
            ON CONFLICT (number) DO NOTHING
            RETURNING number
            "#,
        )
        .bind(insert.number)
        .bind(insert.owner_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(inserted.is_some())
    }
}

#[derive(Debug, Clone)]
pub struct GetOrderOwner {
    pub number: String,
}

impl Processor<GetOrderOwner> for DatabaseProcessor {
    type Output = Option<UserId>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrderOwner")]
    async fn process(&self, query: GetOrderOwner) -> Result<Option<UserId>, sqlx::Error> {
        sqlx::query_scalar::<_, UserId>("SELECT owner_id FROM orders WHERE number = $1")
            .bind(query.number)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// All orders of one user, newest upload first.
pub struct GetOrdersByOwner {
    pub owner_id: UserId,
}

impl Processor<GetOrdersByOwner> for DatabaseProcessor {
    type Output = Vec<OrderRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetOrdersByOwner")]
    async fn process(&self, query: GetOrdersByOwner) -> Result<Vec<OrderRecord>, sqlx::Error> {
        sqlx::query_as::<_, OrderRecord>(
            r#"
            SELECT number, owner_id, status, accrual, uploaded_at
            FROM orders
            WHERE owner_id = $1
            ORDER BY uploaded_at DESC, number
            "#,
        )
        .bind(query.owner_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Numbers of every order not yet in a final state, oldest first.
pub struct GetPendingOrderNumbers;

impl Processor<GetPendingOrderNumbers> for DatabaseProcessor {
    type Output = Vec<String>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetPendingOrderNumbers")]
    async fn process(&self, _: GetPendingOrderNumbers) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT number
            FROM orders
            WHERE status IN ('NEW', 'PROCESSING')
            ORDER BY uploaded_at, number
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
