use std::sync::Arc;

use sqlx::PgPool;

pub mod bets;
pub mod memory;
pub mod multipliers;
pub mod notices;
pub mod results;
pub mod temp_users;
pub mod transactions;
pub mod users;
pub mod withdrawals;

/// Outcomes of wallet-mutating operations that callers must tell apart.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Insufficient balance")]
    InsufficientFunds,
    #[error("{0}")]
    Conflict(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Maps unique-constraint violations to a conflict, everything else stays a database error.
pub(crate) fn unique_violation(error: sqlx::Error, message: &str) -> LedgerError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            LedgerError::Conflict(message.to_string())
        }
        _ => LedgerError::Database(error),
    }
}

#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn users::UserRepository>,
    pub temp_users: Arc<dyn temp_users::TempUserRepository>,
    pub bets: Arc<dyn bets::BetRepository>,
    pub transactions: Arc<dyn transactions::TransactionRepository>,
    pub withdrawals: Arc<dyn withdrawals::WithdrawRepository>,
    pub multipliers: Arc<dyn multipliers::MultiplierRepository>,
    pub notices: Arc<dyn notices::NoticeRepository>,
    pub results: Arc<dyn results::ResultRepository>,
}

impl Repositories {
    pub fn postgres(conn: PgPool) -> Self {
        Repositories {
            users: Arc::new(users::PgUserRepository::new(conn.clone())),
            temp_users: Arc::new(temp_users::PgTempUserRepository::new(conn.clone())),
            bets: Arc::new(bets::PgBetRepository::new(conn.clone())),
            transactions: Arc::new(transactions::PgTransactionRepository::new(conn.clone())),
            withdrawals: Arc::new(withdrawals::PgWithdrawRepository::new(conn.clone())),
            multipliers: Arc::new(multipliers::PgMultiplierRepository::new(conn.clone())),
            notices: Arc::new(notices::PgNoticeRepository::new(conn.clone())),
            results: Arc::new(results::PgResultRepository::new(conn)),
        }
    }

    pub fn memory(store: Arc<memory::MemoryStore>) -> Self {
        Repositories {
            users: store.clone(),
            temp_users: store.clone(),
            bets: store.clone(),
            transactions: store.clone(),
            withdrawals: store.clone(),
            multipliers: store.clone(),
            notices: store.clone(),
            results: store,
        }
    }
}
