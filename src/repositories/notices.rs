use crate::models::notices::Notice;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait NoticeRepository: Send + Sync {
    async fn list_notices(&self) -> Result<Vec<Notice>, anyhow::Error>;

    async fn create_notice(&self, message: &str) -> Result<Notice, anyhow::Error>;

    async fn delete_notice(&self, id: &str) -> Result<bool, anyhow::Error>;
}

#[derive(Clone)]
pub struct PgNoticeRepository {
    conn: PgPool,
}

impl PgNoticeRepository {
    pub fn new(conn: PgPool) -> Self {
        PgNoticeRepository { conn }
    }
}

#[async_trait]
impl NoticeRepository for PgNoticeRepository {
    async fn list_notices(&self) -> Result<Vec<Notice>, anyhow::Error> {
        let rows: Vec<(String, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, message, created_at FROM notices ORDER BY created_at DESC, id ASC",
        )
        .fetch_all(&self.conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, message, created_at)| Notice {
                id,
                message,
                created_at,
            })
            .collect())
    }

    async fn create_notice(&self, message: &str) -> Result<Notice, anyhow::Error> {
        let (id, message, created_at): (String, String, DateTime<Utc>) = sqlx::query_as(
            "INSERT INTO notices (id, message) VALUES ($1, $2) RETURNING id, message, created_at",
        )
        .bind(Uuid::new_v4().hyphenated().to_string())
        .bind(message)
        .fetch_one(&self.conn)
        .await?;

        Ok(Notice {
            id,
            message,
            created_at,
        })
    }

    async fn delete_notice(&self, id: &str) -> Result<bool, anyhow::Error> {
        let result = sqlx::query("DELETE FROM notices WHERE id = $1")
            .bind(id)
            .execute(&self.conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
