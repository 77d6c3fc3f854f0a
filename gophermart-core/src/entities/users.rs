use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, sqlx::Type)]
#[sqlx(transparent)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRecord {
    pub id: UserId,
    pub login: String,
    pub password_hash: String,
    pub created_at: time::OffsetDateTime,
}

impl UserRecord {
    /// Take the row lock that serializes every balance-changing operation of
    /// one user. Held until the surrounding transaction ends.
    pub async fn lock_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: UserId,
    ) -> Result<bool, sqlx::Error> {
        let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(locked.is_some())
    }
}

#[derive(Debug, Clone)]
/// Register a login. Yields `None` when the login is already taken.
pub struct CreateUser {
    pub login: String,
    pub password_hash: String,
}

impl Processor<CreateUser> for DatabaseProcessor {
    type Output = Option<UserId>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:CreateUser")]
    async fn process(&self, insert: CreateUser) -> Result<Option<UserId>, sqlx::Error> {
        sqlx::query_scalar::<_, UserId>(
            r#"
            INSERT INTO users (login, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (login) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(insert.login)
        .bind(insert.password_hash)
        .fetch_optional(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
pub struct GetUserByLogin {
    pub login: String,
}

impl Processor<GetUserByLogin> for DatabaseProcessor {
    type Output = Option<UserRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetUserByLogin")]
    async fn process(&self, query: GetUserByLogin) -> Result<Option<UserRecord>, sqlx::Error> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, login, password_hash, created_at
            FROM users
            WHERE login = $1
            "#,
        )
        .bind(query.login)
        .fetch_optional(&self.pool)
        .await
    }
}
