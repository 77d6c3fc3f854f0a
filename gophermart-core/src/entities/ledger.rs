//! The ledger is the only source of balances: every credit from a processed
//! order and every debit from a withdrawal is one row, and a user's balance is
//! the sum over their rows.

use crate::entities::UserId;
use crate::framework::DatabaseAccessor;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct LedgerEntry {
    pub id: i64,
    pub owner_id: UserId,
    pub order_number: Option<String>,
    pub spending_id: Option<i64>,
    pub credited: Decimal,
    pub debited: Decimal,
    pub created_at: time::OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, sqlx::FromRow)]
pub struct Balance {
    /// Credits minus debits.
    pub current: Decimal,
    /// Debits only.
    pub withdrawn: Decimal,
}

impl Balance {
    /// Sum a user's ledger rows. Inside a transaction holding the user lock
    /// the result stays valid until commit.
    #[tracing::instrument(skip_all, err, name = "SQL:GetBalance")]
    pub async fn fetch(
        db: &mut impl DatabaseAccessor,
        owner_id: UserId,
    ) -> Result<Balance, sqlx::Error> {
        sqlx::query_as::<_, Balance>(
            r#"
            SELECT
                COALESCE(SUM(credited), 0) - COALESCE(SUM(debited), 0) AS current,
                COALESCE(SUM(debited), 0) AS withdrawn
            FROM ledger_entries
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_one(db.acquire())
        .await
    }
}

impl LedgerEntry {
    /// Credit the accrual of a processed order. At most one credit exists per
    /// order; a second call returns `false` and writes nothing.
    pub async fn credit_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        owner_id: UserId,
        order_number: &str,
        amount: Decimal,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_entries (owner_id, order_number, credited, debited)
            VALUES ($1, $2, $3, 0)
            ON CONFLICT (order_number) WHERE order_number IS NOT NULL DO NOTHING
            "#,
        )
        .bind(owner_id)
        .bind(order_number)
        .bind(amount)
        .execute(&mut **tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn debit_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        owner_id: UserId,
        spending_id: i64,
        amount: Decimal,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO ledger_entries (owner_id, spending_id, credited, debited)
            VALUES ($1, $2, 0, $3)
            "#,
        )
        .bind(owner_id)
        .bind(spending_id)
        .bind(amount)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
