use crate::models::users::TempUser;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[async_trait]
pub trait TempUserRepository: Send + Sync {
    async fn get_temp_user(&self, email: &str) -> Result<Option<TempUser>, anyhow::Error>;

    /// Stores the pending signup, replacing any earlier one for the same email.
    async fn upsert_temp_user(&self, temp_user: &TempUser) -> Result<(), anyhow::Error>;

    /// Counts one wrong code against the pending signup and returns the new total.
    /// Returns 0 when there is no pending signup.
    async fn record_failed_attempt(&self, email: &str) -> Result<i32, anyhow::Error>;

    async fn delete_temp_user(&self, email: &str) -> Result<(), anyhow::Error>;
}

#[derive(sqlx::FromRow)]
struct TempUserRow {
    email: String,
    name: String,
    password_hash: String,
    referral: Option<String>,
    otp: String,
    failed_attempts: i32,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<TempUserRow> for TempUser {
    fn from(row: TempUserRow) -> Self {
        TempUser {
            email: row.email,
            name: row.name,
            password_hash: row.password_hash,
            referral: row.referral,
            otp: row.otp,
            failed_attempts: row.failed_attempts,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgTempUserRepository {
    conn: PgPool,
}

impl PgTempUserRepository {
    pub fn new(conn: PgPool) -> Self {
        PgTempUserRepository { conn }
    }
}

#[async_trait]
impl TempUserRepository for PgTempUserRepository {
    async fn get_temp_user(&self, email: &str) -> Result<Option<TempUser>, anyhow::Error> {
        let row = sqlx::query_as::<_, TempUserRow>(
            "SELECT email, name, password_hash, referral, otp, failed_attempts, expires_at, created_at FROM temp_users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.conn)
        .await?;

        Ok(row.map(TempUser::from))
    }

    async fn upsert_temp_user(&self, temp_user: &TempUser) -> Result<(), anyhow::Error> {
        sqlx::query(
            r#"
                INSERT INTO temp_users (email, name, password_hash, referral, otp, failed_attempts, expires_at, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (email) DO UPDATE SET
                    name = EXCLUDED.name,
                    password_hash = EXCLUDED.password_hash,
                    referral = EXCLUDED.referral,
                    otp = EXCLUDED.otp,
                    failed_attempts = EXCLUDED.failed_attempts,
                    expires_at = EXCLUDED.expires_at,
                    created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&temp_user.email)
        .bind(&temp_user.name)
        .bind(&temp_user.password_hash)
        .bind(&temp_user.referral)
        .bind(&temp_user.otp)
        .bind(temp_user.failed_attempts)
        .bind(temp_user.expires_at)
        .bind(temp_user.created_at)
        .execute(&self.conn)
        .await?;

        Ok(())
    }

    async fn record_failed_attempt(&self, email: &str) -> Result<i32, anyhow::Error> {
        let attempts: Option<i32> = sqlx::query_scalar(
            "UPDATE temp_users SET failed_attempts = failed_attempts + 1 WHERE email = $1 RETURNING failed_attempts",
        )
        .bind(email)
        .fetch_optional(&self.conn)
        .await?;

        Ok(attempts.unwrap_or(0))
    }

    async fn delete_temp_user(&self, email: &str) -> Result<(), anyhow::Error> {
        sqlx::query("DELETE FROM temp_users WHERE email = $1")
            .bind(email)
            .execute(&self.conn)
            .await?;

        Ok(())
    }
}
