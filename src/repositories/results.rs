use crate::models::results::{GameResult, IncreaseGrowth, PublishResult, ResultEntry, ResultStatus};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait ResultRepository: Send + Sync {
    async fn current_results(&self) -> Result<Vec<GameResult>, anyhow::Error>;

    /// Most recent draws first.
    async fn result_history(&self, limit: usize) -> Result<Vec<ResultEntry>, anyhow::Error>;

    /// Replaces the live result of the game; draws are also appended to the history.
    async fn publish_result(&self, result: &PublishResult) -> Result<GameResult, anyhow::Error>;

    async fn latest_growth(&self) -> Result<Option<IncreaseGrowth>, anyhow::Error>;
}

#[derive(sqlx::FromRow)]
struct GameResultRow {
    id: String,
    game_name: String,
    number: Option<String>,
    display_time: String,
    status: String,
    updated_at: DateTime<Utc>,
}

impl TryFrom<GameResultRow> for GameResult {
    type Error = anyhow::Error;

    fn try_from(row: GameResultRow) -> Result<Self, Self::Error> {
        Ok(GameResult {
            id: row.id,
            game_name: row.game_name,
            number: row.number,
            display_time: row.display_time,
            status: row.status.parse::<ResultStatus>().map_err(|e| anyhow!(e))?,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ResultEntryRow {
    id: String,
    game_name: String,
    number: Option<String>,
    display_time: String,
    created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct PgResultRepository {
    conn: PgPool,
}

impl PgResultRepository {
    pub fn new(conn: PgPool) -> Self {
        PgResultRepository { conn }
    }
}

#[async_trait]
impl ResultRepository for PgResultRepository {
    async fn current_results(&self) -> Result<Vec<GameResult>, anyhow::Error> {
        let rows = sqlx::query_as::<_, GameResultRow>(
            "SELECT id, game_name, number, display_time, status, updated_at FROM results ORDER BY game_name ASC",
        )
        .fetch_all(&self.conn)
        .await?;

        rows.into_iter().map(GameResult::try_from).collect()
    }

    async fn result_history(&self, limit: usize) -> Result<Vec<ResultEntry>, anyhow::Error> {
        let rows = sqlx::query_as::<_, ResultEntryRow>(
            "SELECT id, game_name, number, display_time, created_at FROM result_list ORDER BY created_at DESC, id ASC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ResultEntry {
                id: row.id,
                game_name: row.game_name,
                number: row.number,
                display_time: row.display_time,
                created_at: row.created_at,
            })
            .collect())
    }

    async fn publish_result(&self, result: &PublishResult) -> Result<GameResult, anyhow::Error> {
        let mut tx = self.conn.begin().await?;

        let row = sqlx::query_as::<_, GameResultRow>(
            r#"
                INSERT INTO results (id, game_name, number, display_time, status)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (game_name) DO UPDATE SET
                    number = EXCLUDED.number,
                    display_time = EXCLUDED.display_time,
                    status = EXCLUDED.status,
                    updated_at = now()
                RETURNING id, game_name, number, display_time, status, updated_at
            "#,
        )
        .bind(Uuid::new_v4().hyphenated().to_string())
        .bind(&result.game_name)
        .bind(&result.number)
        .bind(&result.display_time)
        .bind(result.status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        if result.status == ResultStatus::Draw {
            sqlx::query(
                "INSERT INTO result_list (id, game_name, number, display_time) VALUES ($1, $2, $3, $4)",
            )
            .bind(Uuid::new_v4().hyphenated().to_string())
            .bind(&result.game_name)
            .bind(&result.number)
            .bind(&result.display_time)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        GameResult::try_from(row)
    }

    async fn latest_growth(&self) -> Result<Option<IncreaseGrowth>, anyhow::Error> {
        let row: Option<(String, Decimal, Option<String>, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, rate, note, created_at FROM increase_growth ORDER BY created_at DESC LIMIT 1",
        )
        .fetch_optional(&self.conn)
        .await?;

        Ok(row.map(|(id, rate, note, created_at)| IncreaseGrowth {
            id,
            rate,
            note,
            created_at,
        }))
    }
}
