use crate::entities::UserId;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;

/// A completed withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct SpendingRecord {
    pub id: i64,
    pub owner_id: UserId,
    pub order_reference: String,
    pub amount: Decimal,
    pub processed_at: time::OffsetDateTime,
}

impl SpendingRecord {
    pub async fn insert_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        owner_id: UserId,
        order_reference: &str,
        amount: Decimal,
    ) -> Result<SpendingRecord, sqlx::Error> {
        sqlx::query_as::<_, SpendingRecord>(
            r#"
            INSERT INTO spending (owner_id, order_reference, amount)
            VALUES ($1, $2, $3)
            RETURNING id, owner_id, order_reference, amount, processed_at
            "#,
        )
        .bind(owner_id)
        .bind(order_reference)
        .bind(amount)
        .fetch_one(&mut **tx)
        .await
    }
}

#[derive(Debug, Clone)]
/// Withdrawals of one user, newest first.
pub struct GetSpendingsByOwner {
    pub owner_id: UserId,
}

impl Processor<GetSpendingsByOwner> for DatabaseProcessor {
    type Output = Vec<SpendingRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetSpendingsByOwner")]
    async fn process(&self, query: GetSpendingsByOwner) -> Result<Vec<SpendingRecord>, sqlx::Error> {
        sqlx::query_as::<_, SpendingRecord>(
            r#"
            SELECT id, owner_id, order_reference, amount, processed_at
            FROM spending
            WHERE owner_id = $1
            ORDER BY processed_at DESC, id DESC
            "#,
        )
        .bind(query.owner_id)
        .fetch_all(&self.pool)
        .await
    }
}
