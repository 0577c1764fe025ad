use crate::models::bets::{Bet, BetStatus, NewBet, PlacedBet};
use crate::models::multipliers::BetType;
use crate::models::transactions::{Transaction, TransactionType};
use crate::models::users::TransactionPointer;
use crate::models::Page;

use super::transactions::{append_pointer, insert_transaction};
use super::{unique_violation, LedgerError};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[async_trait]
pub trait BetRepository: Send + Sync {
    /// Debits the wallet, records the bet and its ledger row as one unit.
    ///
    /// The debit only applies while the balance covers the amount, otherwise
    /// nothing is written and `InsufficientFunds` is returned. A bet carrying a
    /// request id that was already used by the same user is returned as-is.
    async fn place_bet(&self, bet: NewBet) -> Result<PlacedBet, LedgerError>;

    async fn list_bets(&self, user_id: &str, page: Page) -> Result<Vec<Bet>, anyhow::Error>;
}

const BET_COLUMNS: &str =
    "id, user_id, bet_type, number, amount, multiplier, prize, status, request_id, created_at";

#[derive(sqlx::FromRow)]
struct BetRow {
    id: String,
    user_id: String,
    bet_type: String,
    number: String,
    amount: Decimal,
    multiplier: Decimal,
    prize: Decimal,
    status: String,
    request_id: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BetRow> for Bet {
    type Error = anyhow::Error;

    fn try_from(row: BetRow) -> Result<Self, Self::Error> {
        Ok(Bet {
            id: row.id,
            user_id: row.user_id,
            bet_type: row.bet_type.parse::<BetType>().map_err(|e| anyhow!(e))?,
            number: row.number,
            amount: row.amount,
            multiplier: row.multiplier,
            prize: row.prize,
            status: row.status.parse::<BetStatus>().map_err(|e| anyhow!(e))?,
            request_id: row.request_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgBetRepository {
    conn: PgPool,
}

impl PgBetRepository {
    pub fn new(conn: PgPool) -> Self {
        PgBetRepository { conn }
    }

    async fn replay_committed(&self, user_id: &str, request_id: &str) -> Result<PlacedBet, LedgerError> {
        let mut tx = self.conn.begin().await?;
        let balance: Decimal = sqlx::query_scalar("SELECT wallet_main FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;

        let placed = find_replay(&mut tx, user_id, request_id, balance)
            .await?
            .ok_or_else(|| LedgerError::Conflict("Duplicate bet request".to_string()))?;
        tx.commit().await?;

        Ok(placed)
    }
}

/// Looks up the bet already placed under `request_id`, with its ledger row.
async fn find_replay(
    conn: &mut PgConnection,
    user_id: &str,
    request_id: &str,
    balance: Decimal,
) -> Result<Option<PlacedBet>, LedgerError> {
    let existing = sqlx::query_as::<_, BetRow>(&format!(
        "SELECT {} FROM bets WHERE user_id = $1 AND request_id = $2",
        BET_COLUMNS
    ))
    .bind(user_id)
    .bind(request_id)
    .fetch_optional(&mut *conn)
    .await?;
    let Some(row) = existing else {
        return Ok(None);
    };

    let bet = Bet::try_from(row)?;
    let transaction_id: String = sqlx::query_scalar(
        "SELECT id FROM transactions WHERE reference_id = $1 AND kind = 'bet_place'",
    )
    .bind(&bet.id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(Some(PlacedBet {
        bet,
        transaction_id,
        new_balance: balance,
        replayed: true,
    }))
}

#[async_trait]
impl BetRepository for PgBetRepository {
    async fn place_bet(&self, new_bet: NewBet) -> Result<PlacedBet, LedgerError> {
        let mut tx = self.conn.begin().await?;

        let user: Option<(String, Decimal)> =
            sqlx::query_as("SELECT id, wallet_main FROM users WHERE email = $1")
                .bind(&new_bet.email)
                .fetch_optional(&mut *tx)
                .await?;
        let Some((user_id, balance)) = user else {
            return Err(LedgerError::NotFound("User".to_string()));
        };

        if let Some(request_id) = &new_bet.request_id {
            if let Some(placed) = find_replay(&mut tx, &user_id, request_id, balance).await? {
                tx.commit().await?;
                return Ok(placed);
            }
        }

        let new_balance: Option<Decimal> = sqlx::query_scalar(
            r#"
                UPDATE users SET
                    wallet_main = wallet_main - $1,
                    total_bets = total_bets + 1,
                    total_bet_amount = total_bet_amount + $1,
                    updated_at = now()
                WHERE id = $2 AND wallet_main >= $1
                RETURNING wallet_main
            "#,
        )
        .bind(new_bet.amount)
        .bind(&user_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(new_balance) = new_balance else {
            return Err(LedgerError::InsufficientFunds);
        };

        let bet_id = Uuid::new_v4().hyphenated().to_string();
        let row = sqlx::query_as::<_, BetRow>(&format!(
            r#"
                INSERT INTO bets (id, user_id, bet_type, number, amount, multiplier, prize, status, request_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending', $8)
                RETURNING {}
            "#,
            BET_COLUMNS
        ))
        .bind(&bet_id)
        .bind(&user_id)
        .bind(new_bet.bet_type.as_str())
        .bind(&new_bet.number)
        .bind(new_bet.amount)
        .bind(new_bet.multiplier)
        .bind(new_bet.prize)
        .bind(&new_bet.request_id)
        .fetch_one(&mut *tx)
        .await;
        let row = match row {
            Ok(row) => row,
            Err(e) => match (unique_violation(e, "Duplicate bet request"), &new_bet.request_id) {
                // A concurrent retry inserted the same request id first.
                (LedgerError::Conflict(_), Some(request_id)) => {
                    tx.rollback().await?;
                    return self.replay_committed(&user_id, request_id).await;
                }
                (error, _) => return Err(error),
            },
        };
        let bet = Bet::try_from(row)?;

        let transaction = Transaction::new(
            &user_id,
            TransactionType::BetPlace,
            -new_bet.amount.abs(),
            &new_bet.currency,
            Some(bet.id.clone()),
            new_bet.note,
        );
        insert_transaction(&mut tx, &transaction).await?;
        append_pointer(
            &mut tx,
            &user_id,
            &TransactionPointer {
                transaction_id: transaction.id.clone(),
                created_at: transaction.created_at,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(PlacedBet {
            bet,
            transaction_id: transaction.id,
            new_balance,
            replayed: false,
        })
    }

    async fn list_bets(&self, user_id: &str, page: Page) -> Result<Vec<Bet>, anyhow::Error> {
        let rows = sqlx::query_as::<_, BetRow>(&format!(
            "SELECT {} FROM bets WHERE user_id = $1 ORDER BY created_at DESC, id ASC LIMIT $2 OFFSET $3",
            BET_COLUMNS
        ))
        .bind(user_id)
        .bind(i64::from(page.limit))
        .bind(page.offset() as i64)
        .fetch_all(&self.conn)
        .await?;

        rows.into_iter().map(Bet::try_from).collect()
    }
}
