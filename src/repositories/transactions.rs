use crate::models::transactions::{Transaction, TransactionType};
use crate::models::users::TransactionPointer;
use crate::models::Page;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, PgConnection, PgPool};

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Ledger rows of one user, newest first.
    async fn list_transactions(
        &self,
        user_id: &str,
        page: Page,
    ) -> Result<Vec<Transaction>, anyhow::Error>;
}

pub(crate) const TRANSACTION_COLUMNS: &str =
    "id, user_id, kind, amount, currency, reference_id, note, created_at";

#[derive(sqlx::FromRow)]
pub(crate) struct TransactionRow {
    id: String,
    user_id: String,
    kind: String,
    amount: Decimal,
    currency: String,
    reference_id: Option<String>,
    note: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = anyhow::Error;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind.parse::<TransactionType>().map_err(|e| anyhow!(e))?,
            amount: row.amount,
            currency: row.currency,
            reference_id: row.reference_id,
            note: row.note,
            created_at: row.created_at,
        })
    }
}

pub(crate) async fn insert_transaction(
    conn: &mut PgConnection,
    transaction: &Transaction,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
            INSERT INTO transactions (id, user_id, kind, amount, currency, reference_id, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(&transaction.id)
    .bind(&transaction.user_id)
    .bind(transaction.kind.as_str())
    .bind(transaction.amount)
    .bind(&transaction.currency)
    .bind(&transaction.reference_id)
    .bind(&transaction.note)
    .bind(transaction.created_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Appends a pointer to the user's transaction list.
pub(crate) async fn append_pointer(
    conn: &mut PgConnection,
    user_id: &str,
    pointer: &TransactionPointer,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET transaction_refs = transaction_refs || $1 WHERE id = $2")
        .bind(Json(vec![pointer]))
        .bind(user_id)
        .execute(conn)
        .await?;

    Ok(())
}

#[derive(Clone)]
pub struct PgTransactionRepository {
    conn: PgPool,
}

impl PgTransactionRepository {
    pub fn new(conn: PgPool) -> Self {
        PgTransactionRepository { conn }
    }
}

#[async_trait]
impl TransactionRepository for PgTransactionRepository {
    async fn list_transactions(
        &self,
        user_id: &str,
        page: Page,
    ) -> Result<Vec<Transaction>, anyhow::Error> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM transactions WHERE user_id = $1 ORDER BY created_at DESC, id ASC LIMIT $2 OFFSET $3",
            TRANSACTION_COLUMNS
        ))
        .bind(user_id)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.conn)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }
}
