use crate::models::multipliers::{BetType, Multiplier};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait MultiplierRepository: Send + Sync {
    async fn list_multipliers(&self) -> Result<Vec<Multiplier>, anyhow::Error>;

    async fn get_multiplier(&self, name: BetType) -> Result<Option<Multiplier>, anyhow::Error>;

    /// Inserts a new multiplier. `None` when one with that name already exists.
    async fn create_multiplier(
        &self,
        name: BetType,
        value: Decimal,
    ) -> Result<Option<Multiplier>, anyhow::Error>;

    async fn upsert_multiplier(&self, name: BetType, value: Decimal)
        -> Result<Multiplier, anyhow::Error>;

    async fn delete_multiplier(&self, id: &str) -> Result<bool, anyhow::Error>;
}

#[derive(sqlx::FromRow)]
struct MultiplierRow {
    id: String,
    name: String,
    value: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MultiplierRow> for Multiplier {
    type Error = anyhow::Error;

    fn try_from(row: MultiplierRow) -> Result<Self, Self::Error> {
        Ok(Multiplier {
            id: row.id,
            name: row.name.parse::<BetType>().map_err(|e| anyhow!(e))?,
            value: row.value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct PgMultiplierRepository {
    conn: PgPool,
}

impl PgMultiplierRepository {
    pub fn new(conn: PgPool) -> Self {
        PgMultiplierRepository { conn }
    }
}

#[async_trait]
impl MultiplierRepository for PgMultiplierRepository {
    async fn list_multipliers(&self) -> Result<Vec<Multiplier>, anyhow::Error> {
        let rows = sqlx::query_as::<_, MultiplierRow>(
            "SELECT id, name, value, created_at, updated_at FROM multipliers ORDER BY array_position(ARRAY['single','double','triple'], name)",
        )
        .fetch_all(&self.conn)
        .await?;

        rows.into_iter().map(Multiplier::try_from).collect()
    }

    async fn get_multiplier(&self, name: BetType) -> Result<Option<Multiplier>, anyhow::Error> {
        let row = sqlx::query_as::<_, MultiplierRow>(
            "SELECT id, name, value, created_at, updated_at FROM multipliers WHERE name = $1",
        )
        .bind(name.as_str())
        .fetch_optional(&self.conn)
        .await?;

        row.map(Multiplier::try_from).transpose()
    }

    async fn create_multiplier(
        &self,
        name: BetType,
        value: Decimal,
    ) -> Result<Option<Multiplier>, anyhow::Error> {
        let row = sqlx::query_as::<_, MultiplierRow>(
            r#"
                INSERT INTO multipliers (id, name, value) VALUES ($1, $2, $3)
                ON CONFLICT (name) DO NOTHING
                RETURNING id, name, value, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4().hyphenated().to_string())
        .bind(name.as_str())
        .bind(value)
        .fetch_optional(&self.conn)
        .await?;

        row.map(Multiplier::try_from).transpose()
    }

    async fn upsert_multiplier(
        &self,
        name: BetType,
        value: Decimal,
    ) -> Result<Multiplier, anyhow::Error> {
        let row = sqlx::query_as::<_, MultiplierRow>(
            r#"
                INSERT INTO multipliers (id, name, value) VALUES ($1, $2, $3)
                ON CONFLICT (name) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
                RETURNING id, name, value, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4().hyphenated().to_string())
        .bind(name.as_str())
        .bind(value)
        .fetch_one(&self.conn)
        .await?;

        Multiplier::try_from(row)
    }

    async fn delete_multiplier(&self, id: &str) -> Result<bool, anyhow::Error> {
        let result = sqlx::query("DELETE FROM multipliers WHERE id = $1")
            .bind(id)
            .execute(&self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
