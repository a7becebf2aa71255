//! PostgreSQL-backed user directory.

use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};

use avio_core::{
    directory::UserDirectory,
    domain::{UserId, UserRecord},
    Error, Result,
};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS users (
    telegram_id BIGINT PRIMARY KEY,
    username    VARCHAR(255),
    phone       VARCHAR(50)  NOT NULL,
    country     VARCHAR(100) NOT NULL
)";

pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    /// Connect and ensure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(db_err)?;
        sqlx::query(SCHEMA).execute(&pool).await.map_err(db_err)?;
        tracing::info!("connected to postgres user directory");
        Ok(Self { pool })
    }
}

fn db_err(e: sqlx::Error) -> Error {
    Error::Directory(e.to_string())
}

fn row_to_record(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: UserId(row.get::<i64, _>("telegram_id")),
        username: row.get("username"),
        phone: row.get("phone"),
        country: row.get("country"),
    }
}

#[async_trait]
impl UserDirectory for PgDirectory {
    async fn get_user(&self, id: UserId) -> Result<Option<UserRecord>> {
        let row = sqlx::query(
            "SELECT telegram_id, username, phone, country FROM users WHERE telegram_id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_record))
    }

    async fn get_user_by_handle(&self, handle: &str) -> Result<Option<UserRecord>> {
        let row = sqlx::query(
            "SELECT telegram_id, username, phone, country FROM users \
             WHERE LOWER(username) = LOWER($1)",
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(row.as_ref().map(row_to_record))
    }

    async fn list_all(&self) -> Result<Vec<UserRecord>> {
        let rows = sqlx::query(
            "SELECT telegram_id, username, phone, country FROM users ORDER BY telegram_id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.iter().map(row_to_record).collect())
    }

    async fn list_countries(&self) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT DISTINCT country FROM users WHERE country <> $1 ORDER BY country",
        )
        .bind(UserRecord::UNKNOWN_COUNTRY)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.iter().map(|r| r.get("country")).collect())
    }

    async fn list_by_country(&self, country: &str) -> Result<Vec<UserId>> {
        let rows = sqlx::query(
            "SELECT telegram_id FROM users WHERE country = $1 ORDER BY telegram_id",
        )
        .bind(country)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(rows.iter().map(|r| UserId(r.get("telegram_id"))).collect())
    }

    async fn insert_if_absent(&self, record: &UserRecord) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO users (telegram_id, username, phone, country) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (telegram_id) DO NOTHING",
        )
        .bind(record.id.0)
        .bind(&record.username)
        .bind(&record.phone)
        .bind(&record.country)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }
}
