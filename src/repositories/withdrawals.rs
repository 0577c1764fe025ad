use crate::models::transactions::{Transaction, TransactionType};
use crate::models::users::TransactionPointer;
use crate::models::withdrawals::{NewWithdraw, Withdraw, WithdrawMethod, WithdrawStatus};

use super::transactions::{append_pointer, insert_transaction};
use super::LedgerError;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[async_trait]
pub trait WithdrawRepository: Send + Sync {
    /// Debits the requested amount and records the withdraw with its ledger row.
    /// Returns the request and the remaining main balance.
    async fn create_withdraw(
        &self,
        withdraw: &NewWithdraw,
        currency: &str,
    ) -> Result<(Withdraw, Decimal), LedgerError>;

    async fn list_withdraws_for_agent(
        &self,
        agent_email: &str,
    ) -> Result<Vec<Withdraw>, anyhow::Error>;

    async fn get_withdraw(&self, id: &str) -> Result<Option<Withdraw>, anyhow::Error>;

    /// Moves a pending withdraw to its final status. Rejections refund the user.
    async fn resolve_withdraw(
        &self,
        id: &str,
        status: WithdrawStatus,
        currency: &str,
    ) -> Result<Withdraw, LedgerError>;
}

const WITHDRAW_COLUMNS: &str =
    "id, user_email, agent_email, method, payment_number, amount, status, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct WithdrawRow {
    id: String,
    user_email: String,
    agent_email: String,
    method: String,
    payment_number: String,
    amount: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<WithdrawRow> for Withdraw {
    type Error = anyhow::Error;

    fn try_from(row: WithdrawRow) -> Result<Self, Self::Error> {
        Ok(Withdraw {
            id: row.id,
            user_email: row.user_email,
            agent_email: row.agent_email,
            method: row.method.parse::<WithdrawMethod>().map_err(|e| anyhow!(e))?,
            payment_number: row.payment_number,
            amount: row.amount,
            status: row.status.parse::<WithdrawStatus>().map_err(|e| anyhow!(e))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

async fn record(
    conn: &mut PgConnection,
    transaction: &Transaction,
) -> Result<(), sqlx::Error> {
    insert_transaction(&mut *conn, transaction).await?;
    append_pointer(
        conn,
        &transaction.user_id,
        &TransactionPointer {
            transaction_id: transaction.id.clone(),
            created_at: transaction.created_at,
        },
    )
    .await
}

#[derive(Clone)]
pub struct PgWithdrawRepository {
    conn: PgPool,
}

impl PgWithdrawRepository {
    pub fn new(conn: PgPool) -> Self {
        PgWithdrawRepository { conn }
    }
}

#[async_trait]
impl WithdrawRepository for PgWithdrawRepository {
    async fn create_withdraw(
        &self,
        withdraw: &NewWithdraw,
        currency: &str,
    ) -> Result<(Withdraw, Decimal), LedgerError> {
        let mut tx = self.conn.begin().await?;

        let user_id: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE email = $1")
            .bind(&withdraw.user_email)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(user_id) = user_id else {
            return Err(LedgerError::NotFound("User".to_string()));
        };

        let balance: Option<Decimal> = sqlx::query_scalar(
            "UPDATE users SET wallet_main = wallet_main - $1, updated_at = now() WHERE id = $2 AND wallet_main >= $1 RETURNING wallet_main",
        )
        .bind(withdraw.amount)
        .bind(&user_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(balance) = balance else {
            return Err(LedgerError::InsufficientFunds);
        };

        let row = sqlx::query_as::<_, WithdrawRow>(&format!(
            r#"
                INSERT INTO withdraws (id, user_email, agent_email, method, payment_number, amount, status)
                VALUES ($1, $2, $3, $4, $5, $6, 'pending')
                RETURNING {}
            "#,
            WITHDRAW_COLUMNS
        ))
        .bind(Uuid::new_v4().hyphenated().to_string())
        .bind(&withdraw.user_email)
        .bind(&withdraw.agent_email)
        .bind(withdraw.method.as_str())
        .bind(&withdraw.payment_number)
        .bind(withdraw.amount)
        .fetch_one(&mut *tx)
        .await?;
        let created = Withdraw::try_from(row)?;

        let transaction = Transaction::new(
            &user_id,
            TransactionType::WithdrawRequest,
            -withdraw.amount,
            currency,
            Some(created.id.clone()),
            format!(
                "Withdraw via {} to {}",
                withdraw.method.as_str(),
                withdraw.payment_number
            ),
        );
        record(&mut tx, &transaction).await?;

        tx.commit().await?;

        Ok((created, balance))
    }

    async fn list_withdraws_for_agent(
        &self,
        agent_email: &str,
    ) -> Result<Vec<Withdraw>, anyhow::Error> {
        let rows = sqlx::query_as::<_, WithdrawRow>(&format!(
            "SELECT {} FROM withdraws WHERE agent_email = $1 ORDER BY created_at DESC, id ASC",
            WITHDRAW_COLUMNS
        ))
        .bind(agent_email)
        .fetch_all(&self.conn)
        .await?;

        rows.into_iter().map(Withdraw::try_from).collect()
    }

    async fn get_withdraw(&self, id: &str) -> Result<Option<Withdraw>, anyhow::Error> {
        let row = sqlx::query_as::<_, WithdrawRow>(&format!(
            "SELECT {} FROM withdraws WHERE id = $1",
            WITHDRAW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.conn)
        .await?;

        row.map(Withdraw::try_from).transpose()
    }

    async fn resolve_withdraw(
        &self,
        id: &str,
        status: WithdrawStatus,
        currency: &str,
    ) -> Result<Withdraw, LedgerError> {
        let mut tx = self.conn.begin().await?;

        let row = sqlx::query_as::<_, WithdrawRow>(&format!(
            "SELECT {} FROM withdraws WHERE id = $1 FOR UPDATE",
            WITHDRAW_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(row) = row else {
            return Err(LedgerError::NotFound("Withdraw".to_string()));
        };
        let current = Withdraw::try_from(row)?;

        if current.status != WithdrawStatus::Pending {
            return Err(LedgerError::Conflict(format!(
                "Withdraw is already {}",
                current.status.as_str()
            )));
        }

        let row = sqlx::query_as::<_, WithdrawRow>(&format!(
            "UPDATE withdraws SET status = $1, updated_at = now() WHERE id = $2 RETURNING {}",
            WITHDRAW_COLUMNS
        ))
        .bind(status.as_str())
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        let resolved = Withdraw::try_from(row)?;

        if status == WithdrawStatus::Rejected {
            let user_id: Option<String> = sqlx::query_scalar(
                "UPDATE users SET wallet_main = wallet_main + $1, updated_at = now() WHERE email = $2 RETURNING id",
            )
            .bind(resolved.amount)
            .bind(&resolved.user_email)
            .fetch_optional(&mut *tx)
            .await?;
            let Some(user_id) = user_id else {
                return Err(LedgerError::NotFound("User".to_string()));
            };

            let transaction = Transaction::new(
                &user_id,
                TransactionType::WithdrawRefund,
                resolved.amount,
                currency,
                Some(resolved.id.clone()),
                "Withdraw rejected, amount refunded".to_string(),
            );
            record(&mut tx, &transaction).await?;
        }

        tx.commit().await?;

        Ok(resolved)
    }
}
