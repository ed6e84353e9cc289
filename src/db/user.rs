use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{timed, UserStore};
use crate::{
    dto::UpdateUserDto,
    errors::StoreError,
    models::{NewUser, User},
    PGPool,
};

const USER_COLUMNS: &str = "id, name, email, password, role, created_at";

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password: row.password,
            role: row.role.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
        })
    }
}

pub struct PgUserStore {
    pool: PGPool,
    timeout: Duration,
}

impl PgUserStore {
    pub fn new(pool: PGPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let user = user.into_user(Uuid::new_v4());
        // users_email_key turns a concurrent duplicate signup into DuplicateKey
        let query = sqlx::query(
            "INSERT INTO users (id, name, email, password, role, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool);
        timed(self.timeout, query).await?;
        Ok(user)
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = timed(
            self.timeout,
            sqlx::query_as::<_, UserRow>(&sql).bind(id).fetch_optional(&self.pool),
        )
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = timed(
            self.timeout,
            sqlx::query_as::<_, UserRow>(&sql).bind(email).fetch_optional(&self.pool),
        )
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn get_all(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC");
        let rows = timed(
            self.timeout,
            sqlx::query_as::<_, UserRow>(&sql).fetch_all(&self.pool),
        )
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn count(&self) -> Result<u64, StoreError> {
        let total: i64 = timed(
            self.timeout,
            sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(&self.pool),
        )
        .await?;
        Ok(total.max(0) as u64)
    }

    async fn update(&self, id: Uuid, fields: &UpdateUserDto) -> Result<u64, StoreError> {
        if fields.is_empty() {
            return Ok(0);
        }
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut separated = query_builder.separated(", ");
        if let Some(name) = &fields.name {
            separated.push("name = ").push_bind_unseparated(name);
        }
        if let Some(email) = &fields.email {
            separated.push("email = ").push_bind_unseparated(email);
        }
        if let Some(role) = fields.role {
            separated.push("role = ").push_bind_unseparated(role.as_str());
        }
        query_builder.push(" WHERE id = ").push_bind(id);

        let res = timed(self.timeout, query_builder.build().execute(&self.pool)).await?;
        Ok(res.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> Result<u64, StoreError> {
        let res = timed(
            self.timeout,
            sqlx::query("DELETE FROM users WHERE id = $1").bind(id).execute(&self.pool),
        )
        .await?;
        Ok(res.rows_affected())
    }
}
