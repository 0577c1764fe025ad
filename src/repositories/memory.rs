//! Process-local storage backend.
//!
//! Every table sits behind one mutex, so each trait method is atomic with
//! respect to the others. Used by the test-suite and by `--memory` runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::bets::{Bet, BetStatus, NewBet, PlacedBet};
use crate::models::multipliers::{BetType, Multiplier};
use crate::models::notices::Notice;
use crate::models::results::{GameResult, IncreaseGrowth, PublishResult, ResultEntry, ResultStatus};
use crate::models::transactions::{Transaction, TransactionType};
use crate::models::users::{
    AgentLink, NewUser, ProfileUpdate, Role, TempUser, TransactionPointer, User, UserCategory,
    UserQuery,
};
use crate::models::withdrawals::{NewWithdraw, Withdraw, WithdrawStatus};
use crate::models::Page;

use super::bets::BetRepository;
use super::multipliers::MultiplierRepository;
use super::notices::NoticeRepository;
use super::results::ResultRepository;
use super::temp_users::TempUserRepository;
use super::transactions::TransactionRepository;
use super::users::UserRepository;
use super::withdrawals::WithdrawRepository;
use super::LedgerError;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    temp_users: HashMap<String, TempUser>,
    multipliers: Vec<Multiplier>,
    bets: Vec<Bet>,
    transactions: Vec<Transaction>,
    notices: Vec<Notice>,
    withdraws: Vec<Withdraw>,
    results: Vec<GameResult>,
    result_list: Vec<ResultEntry>,
    growth: Vec<IncreaseGrowth>,
}

impl Tables {
    fn user_index(&self, email: &str) -> Option<usize> {
        self.users.iter().position(|u| u.email == email)
    }

    /// Appends a ledger row and the matching pointer on its owner.
    fn record(&mut self, user_index: usize, transaction: Transaction) {
        let user = &mut self.users[user_index];
        user.transactions.push(TransactionPointer {
            transaction_id: transaction.id.clone(),
            created_at: transaction.created_at,
        });
        user.updated_at = transaction.created_at;
        self.transactions.push(transaction);
    }
}

fn page_of<T: Clone>(items: &[T], page: Page) -> Vec<T> {
    items
        .iter()
        .skip(page.offset() as usize)
        .take(page.limit as usize)
        .cloned()
        .collect()
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    user_queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, anyhow::Error> {
        self.tables
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }

    /// Seeds an account directly, bypassing signup.
    pub fn insert_user(&self, user: User) -> Result<(), anyhow::Error> {
        let mut tables = self.tables()?;
        if tables.user_index(&user.email).is_some() {
            return Err(anyhow!("user {} already exists", user.email));
        }
        tables.users.push(user);
        Ok(())
    }

    pub fn insert_growth(&self, rate: Decimal, note: Option<String>) -> Result<IncreaseGrowth, anyhow::Error> {
        let growth = IncreaseGrowth {
            id: Uuid::new_v4().hyphenated().to_string(),
            rate,
            note,
            created_at: Utc::now(),
        };
        self.tables()?.growth.push(growth.clone());
        Ok(growth)
    }

    /// Number of user listing queries served so far.
    pub fn user_query_count(&self) -> usize {
        self.user_queries.load(Ordering::SeqCst)
    }

    pub fn user(&self, email: &str) -> Option<User> {
        let tables = self.tables().ok()?;
        tables.users.iter().find(|u| u.email == email).cloned()
    }

    pub fn transactions_of(&self, user_id: &str) -> Vec<Transaction> {
        self.tables()
            .map(|t| {
                t.transactions
                    .iter()
                    .filter(|tx| tx.user_id == user_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn bets_of(&self, user_id: &str) -> Vec<Bet> {
        self.tables()
            .map(|t| t.bets.iter().filter(|b| b.user_id == user_id).cloned().collect())
            .unwrap_or_default()
    }

    pub fn temp_user(&self, email: &str) -> Option<TempUser> {
        self.tables().ok()?.temp_users.get(email).cloned()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        let tables = self.tables()?;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, anyhow::Error> {
        let tables = self.tables()?;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn get_user_by_referral_code(&self, code: &str) -> Result<Option<User>, anyhow::Error> {
        let tables = self.tables()?;
        Ok(tables.users.iter().find(|u| u.referral_code == code).cloned())
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, LedgerError> {
        let mut guard = self.tables()?;
        let tables = &mut *guard;

        if tables.user_index(&new_user.email).is_some() {
            return Err(LedgerError::Conflict("User already exists".to_string()));
        }
        if tables
            .users
            .iter()
            .any(|u| u.referral_code == new_user.referral_code)
        {
            return Err(LedgerError::Conflict("Referral code already taken".to_string()));
        }

        let mut user = User::new(
            &new_user.name,
            &new_user.email,
            new_user.password_hash,
            Role::User,
            new_user.referral_code,
        );
        user.referred_by = new_user.referred_by.clone();
        user.wallet.bonus = new_user.signup_bonus;

        if let Some(referrer_id) = &new_user.referred_by {
            if let Some(referrer) = tables.users.iter_mut().find(|u| &u.id == referrer_id) {
                referrer.my_refer_list.push(user.id.clone());
            }
        }

        let user_id = user.id.clone();
        tables.users.push(user);
        let index = tables.users.len() - 1;

        if new_user.signup_bonus > Decimal::ZERO {
            let transaction = Transaction::new(
                &user_id,
                TransactionType::SignupBonus,
                new_user.signup_bonus,
                &new_user.currency,
                None,
                "Signup bonus".to_string(),
            );
            tables.record(index, transaction);
        }

        Ok(tables.users[index].clone())
    }

    async fn update_profile(
        &self,
        email: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, anyhow::Error> {
        let mut tables = self.tables()?;
        let Some(user) = tables.users.iter_mut().find(|u| u.email == email) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(phone) = &update.phone {
            user.phone = Some(phone.clone());
        }
        if let Some(avatar) = &update.avatar {
            user.avatar = Some(avatar.clone());
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn set_online(&self, email: &str, online: bool) -> Result<(), anyhow::Error> {
        let mut tables = self.tables()?;
        if let Some(user) = tables.users.iter_mut().find(|u| u.email == email) {
            user.is_online = online;
        }
        Ok(())
    }

    async fn query_users(&self, query: &UserQuery) -> Result<(Vec<User>, i64), anyhow::Error> {
        self.user_queries.fetch_add(1, Ordering::SeqCst);
        let tables = self.tables()?;

        let mut matches: Vec<User> = tables
            .users
            .iter()
            .filter(|u| query.search.is_empty() || u.email.contains(&query.search))
            .filter(|u| query.category.role().map_or(true, |role| u.role == role))
            .cloned()
            .collect();

        match query.category {
            UserCategory::Oldest => {
                matches.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            }
            UserCategory::Balance => matches.sort_by(|a, b| {
                b.wallet
                    .main
                    .cmp(&a.wallet.main)
                    .then(b.created_at.cmp(&a.created_at))
                    .then(a.id.cmp(&b.id))
            }),
            _ => matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id))),
        }

        let total = matches.len() as i64;
        Ok((page_of(&matches, query.page), total))
    }

    async fn list_referrals(&self, user_id: &str) -> Result<Vec<User>, anyhow::Error> {
        let tables = self.tables()?;
        let mut referrals: Vec<User> = tables
            .users
            .iter()
            .filter(|u| u.referred_by.as_deref() == Some(user_id))
            .cloned()
            .collect();
        referrals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(referrals)
    }

    async fn list_agents(&self) -> Result<Vec<User>, anyhow::Error> {
        let tables = self.tables()?;
        let mut agents: Vec<User> = tables
            .users
            .iter()
            .filter(|u| u.role == Role::Agent && u.is_active)
            .cloned()
            .collect();
        agents.sort_by(|a, b| b.like_count.cmp(&a.like_count).then(a.name.cmp(&b.name)));
        Ok(agents)
    }

    async fn toggle_like(
        &self,
        agent_id: &str,
        user_id: &str,
    ) -> Result<Option<(bool, i64)>, anyhow::Error> {
        let mut tables = self.tables()?;
        let Some(agent) = tables.users.iter_mut().find(|u| u.id == agent_id) else {
            return Ok(None);
        };

        let liked = match agent.likes.iter().position(|id| id == user_id) {
            Some(index) => {
                agent.likes.remove(index);
                false
            }
            None => {
                agent.likes.push(user_id.to_string());
                true
            }
        };
        agent.like_count = agent.likes.len() as i64;
        agent.updated_at = Utc::now();

        Ok(Some((liked, agent.like_count)))
    }

    async fn set_agent_link(
        &self,
        email: &str,
        link: &AgentLink,
    ) -> Result<Option<Vec<AgentLink>>, anyhow::Error> {
        let mut tables = self.tables()?;
        let Some(user) = tables.users.iter_mut().find(|u| u.email == email) else {
            return Ok(None);
        };

        user.link.retain(|existing| existing.title != link.title);
        user.link.push(link.clone());
        user.updated_at = Utc::now();

        Ok(Some(user.link.clone()))
    }
}

#[async_trait]
impl TempUserRepository for MemoryStore {
    async fn get_temp_user(&self, email: &str) -> Result<Option<TempUser>, anyhow::Error> {
        Ok(self.tables()?.temp_users.get(email).cloned())
    }

    async fn upsert_temp_user(&self, temp_user: &TempUser) -> Result<(), anyhow::Error> {
        self.tables()?
            .temp_users
            .insert(temp_user.email.clone(), temp_user.clone());
        Ok(())
    }

    async fn record_failed_attempt(&self, email: &str) -> Result<i32, anyhow::Error> {
        let mut tables = self.tables()?;
        Ok(match tables.temp_users.get_mut(email) {
            Some(temp_user) => {
                temp_user.failed_attempts += 1;
                temp_user.failed_attempts
            }
            None => 0,
        })
    }

    async fn delete_temp_user(&self, email: &str) -> Result<(), anyhow::Error> {
        self.tables()?.temp_users.remove(email);
        Ok(())
    }
}

#[async_trait]
impl BetRepository for MemoryStore {
    async fn place_bet(&self, new_bet: NewBet) -> Result<PlacedBet, LedgerError> {
        let mut guard = self.tables()?;
        let tables = &mut *guard;

        let index = tables
            .user_index(&new_bet.email)
            .ok_or_else(|| LedgerError::NotFound("User".to_string()))?;
        let user_id = tables.users[index].id.clone();

        if let Some(request_id) = &new_bet.request_id {
            let existing = tables
                .bets
                .iter()
                .find(|b| b.user_id == user_id && b.request_id.as_ref() == Some(request_id));

            if let Some(bet) = existing {
                let transaction_id = tables
                    .transactions
                    .iter()
                    .find(|t| {
                        t.kind == TransactionType::BetPlace
                            && t.reference_id.as_deref() == Some(bet.id.as_str())
                    })
                    .map(|t| t.id.clone())
                    .ok_or_else(|| anyhow!("bet {} has no ledger row", bet.id))?;

                return Ok(PlacedBet {
                    bet: bet.clone(),
                    transaction_id,
                    new_balance: tables.users[index].wallet.main,
                    replayed: true,
                });
            }
        }

        if tables.users[index].wallet.main < new_bet.amount {
            return Err(LedgerError::InsufficientFunds);
        }

        let bet = Bet {
            id: Uuid::new_v4().hyphenated().to_string(),
            user_id: user_id.clone(),
            bet_type: new_bet.bet_type,
            number: new_bet.number,
            amount: new_bet.amount,
            multiplier: new_bet.multiplier,
            prize: new_bet.prize,
            status: BetStatus::Pending,
            request_id: new_bet.request_id,
            created_at: Utc::now(),
        };
        let transaction = Transaction::new(
            &user_id,
            TransactionType::BetPlace,
            -new_bet.amount.abs(),
            &new_bet.currency,
            Some(bet.id.clone()),
            new_bet.note,
        );
        let transaction_id = transaction.id.clone();

        let user = &mut tables.users[index];
        user.wallet.main -= new_bet.amount;
        user.total_bets += 1;
        user.total_bet_amount += new_bet.amount;
        let new_balance = user.wallet.main;

        tables.bets.push(bet.clone());
        tables.record(index, transaction);

        Ok(PlacedBet {
            bet,
            transaction_id,
            new_balance,
            replayed: false,
        })
    }

    async fn list_bets(&self, user_id: &str, page: Page) -> Result<Vec<Bet>, anyhow::Error> {
        let tables = self.tables()?;
        let mut bets: Vec<Bet> = tables
            .bets
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bets.reverse();
        Ok(page_of(&bets, page))
    }
}

#[async_trait]
impl TransactionRepository for MemoryStore {
    async fn list_transactions(
        &self,
        user_id: &str,
        page: Page,
    ) -> Result<Vec<Transaction>, anyhow::Error> {
        let tables = self.tables()?;
        let mut transactions: Vec<Transaction> = tables
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        transactions.reverse();
        Ok(page_of(&transactions, page))
    }
}

#[async_trait]
impl WithdrawRepository for MemoryStore {
    async fn create_withdraw(
        &self,
        withdraw: &NewWithdraw,
        currency: &str,
    ) -> Result<(Withdraw, Decimal), LedgerError> {
        let mut guard = self.tables()?;
        let tables = &mut *guard;

        let index = tables
            .user_index(&withdraw.user_email)
            .ok_or_else(|| LedgerError::NotFound("User".to_string()))?;
        if tables.users[index].wallet.main < withdraw.amount {
            return Err(LedgerError::InsufficientFunds);
        }

        let now = Utc::now();
        let created = Withdraw {
            id: Uuid::new_v4().hyphenated().to_string(),
            user_email: withdraw.user_email.clone(),
            agent_email: withdraw.agent_email.clone(),
            method: withdraw.method,
            payment_number: withdraw.payment_number.clone(),
            amount: withdraw.amount,
            status: WithdrawStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        let transaction = Transaction::new(
            &tables.users[index].id,
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

        tables.users[index].wallet.main -= withdraw.amount;
        let balance = tables.users[index].wallet.main;
        tables.withdraws.push(created.clone());
        tables.record(index, transaction);

        Ok((created, balance))
    }

    async fn list_withdraws_for_agent(
        &self,
        agent_email: &str,
    ) -> Result<Vec<Withdraw>, anyhow::Error> {
        let tables = self.tables()?;
        let mut withdraws: Vec<Withdraw> = tables
            .withdraws
            .iter()
            .filter(|w| w.agent_email == agent_email)
            .cloned()
            .collect();
        withdraws.reverse();
        Ok(withdraws)
    }

    async fn get_withdraw(&self, id: &str) -> Result<Option<Withdraw>, anyhow::Error> {
        Ok(self.tables()?.withdraws.iter().find(|w| w.id == id).cloned())
    }

    async fn resolve_withdraw(
        &self,
        id: &str,
        status: WithdrawStatus,
        currency: &str,
    ) -> Result<Withdraw, LedgerError> {
        let mut guard = self.tables()?;
        let tables = &mut *guard;

        let position = tables
            .withdraws
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| LedgerError::NotFound("Withdraw".to_string()))?;

        let current = tables.withdraws[position].status;
        if current != WithdrawStatus::Pending {
            return Err(LedgerError::Conflict(format!(
                "Withdraw is already {}",
                current.as_str()
            )));
        }

        let user_index = if status == WithdrawStatus::Rejected {
            let email = tables.withdraws[position].user_email.clone();
            Some(
                tables
                    .user_index(&email)
                    .ok_or_else(|| LedgerError::NotFound("User".to_string()))?,
            )
        } else {
            None
        };

        let withdraw = &mut tables.withdraws[position];
        withdraw.status = status;
        withdraw.updated_at = Utc::now();
        let resolved = withdraw.clone();

        if let Some(index) = user_index {
            tables.users[index].wallet.main += resolved.amount;
            let transaction = Transaction::new(
                &tables.users[index].id,
                TransactionType::WithdrawRefund,
                resolved.amount,
                currency,
                Some(resolved.id.clone()),
                "Withdraw rejected, amount refunded".to_string(),
            );
            tables.record(index, transaction);
        }

        Ok(resolved)
    }
}

#[async_trait]
impl MultiplierRepository for MemoryStore {
    async fn list_multipliers(&self) -> Result<Vec<Multiplier>, anyhow::Error> {
        let tables = self.tables()?;
        let mut multipliers = tables.multipliers.clone();
        multipliers.sort_by_key(|m| BetType::ALL.iter().position(|t| *t == m.name));
        Ok(multipliers)
    }

    async fn get_multiplier(&self, name: BetType) -> Result<Option<Multiplier>, anyhow::Error> {
        let tables = self.tables()?;
        Ok(tables.multipliers.iter().find(|m| m.name == name).cloned())
    }

    async fn create_multiplier(
        &self,
        name: BetType,
        value: Decimal,
    ) -> Result<Option<Multiplier>, anyhow::Error> {
        let mut tables = self.tables()?;
        if tables.multipliers.iter().any(|m| m.name == name) {
            return Ok(None);
        }

        let now = Utc::now();
        let multiplier = Multiplier {
            id: Uuid::new_v4().hyphenated().to_string(),
            name,
            value,
            created_at: now,
            updated_at: now,
        };
        tables.multipliers.push(multiplier.clone());

        Ok(Some(multiplier))
    }

    async fn upsert_multiplier(
        &self,
        name: BetType,
        value: Decimal,
    ) -> Result<Multiplier, anyhow::Error> {
        let mut tables = self.tables()?;
        let now = Utc::now();

        if let Some(existing) = tables.multipliers.iter_mut().find(|m| m.name == name) {
            existing.value = value;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let multiplier = Multiplier {
            id: Uuid::new_v4().hyphenated().to_string(),
            name,
            value,
            created_at: now,
            updated_at: now,
        };
        tables.multipliers.push(multiplier.clone());

        Ok(multiplier)
    }

    async fn delete_multiplier(&self, id: &str) -> Result<bool, anyhow::Error> {
        let mut tables = self.tables()?;
        let before = tables.multipliers.len();
        tables.multipliers.retain(|m| m.id != id);
        Ok(tables.multipliers.len() != before)
    }
}

#[async_trait]
impl NoticeRepository for MemoryStore {
    async fn list_notices(&self) -> Result<Vec<Notice>, anyhow::Error> {
        let mut notices = self.tables()?.notices.clone();
        notices.reverse();
        Ok(notices)
    }

    async fn create_notice(&self, message: &str) -> Result<Notice, anyhow::Error> {
        let notice = Notice {
            id: Uuid::new_v4().hyphenated().to_string(),
            message: message.to_string(),
            created_at: Utc::now(),
        };
        self.tables()?.notices.push(notice.clone());
        Ok(notice)
    }

    async fn delete_notice(&self, id: &str) -> Result<bool, anyhow::Error> {
        let mut tables = self.tables()?;
        let before = tables.notices.len();
        tables.notices.retain(|n| n.id != id);
        Ok(tables.notices.len() != before)
    }
}

#[async_trait]
impl ResultRepository for MemoryStore {
    async fn current_results(&self) -> Result<Vec<GameResult>, anyhow::Error> {
        let mut results = self.tables()?.results.clone();
        results.sort_by(|a, b| a.game_name.cmp(&b.game_name));
        Ok(results)
    }

    async fn result_history(&self, limit: usize) -> Result<Vec<ResultEntry>, anyhow::Error> {
        let tables = self.tables()?;
        Ok(tables.result_list.iter().rev().take(limit).cloned().collect())
    }

    async fn publish_result(&self, result: &PublishResult) -> Result<GameResult, anyhow::Error> {
        let mut tables = self.tables()?;
        let now = Utc::now();

        let published = match tables
            .results
            .iter_mut()
            .find(|r| r.game_name == result.game_name)
        {
            Some(existing) => {
                existing.number = result.number.clone();
                existing.display_time = result.display_time.clone();
                existing.status = result.status;
                existing.updated_at = now;
                existing.clone()
            }
            None => {
                let created = GameResult {
                    id: Uuid::new_v4().hyphenated().to_string(),
                    game_name: result.game_name.clone(),
                    number: result.number.clone(),
                    display_time: result.display_time.clone(),
                    status: result.status,
                    updated_at: now,
                };
                tables.results.push(created.clone());
                created
            }
        };

        if result.status == ResultStatus::Draw {
            tables.result_list.push(ResultEntry {
                id: Uuid::new_v4().hyphenated().to_string(),
                game_name: result.game_name.clone(),
                number: result.number.clone(),
                display_time: result.display_time.clone(),
                created_at: now,
            });
        }

        Ok(published)
    }

    async fn latest_growth(&self) -> Result<Option<IncreaseGrowth>, anyhow::Error> {
        let tables = self.tables()?;
        Ok(tables.growth.iter().max_by_key(|g| g.created_at).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::users::User;

    fn store_with_user(balance: i64) -> (MemoryStore, User) {
        let store = MemoryStore::new();
        let mut user = User::new("Ann", "ann@example.com", String::new(), Role::User, "ANN00001".into());
        user.wallet.main = Decimal::from(balance);
        store.insert_user(user.clone()).unwrap();
        (store, user)
    }

    fn wager(amount: i64, request_id: Option<&str>) -> NewBet {
        NewBet {
            email: "ann@example.com".into(),
            bet_type: BetType::Single,
            number: "7".into(),
            amount: Decimal::from(amount),
            multiplier: Decimal::from(9),
            prize: Decimal::from(amount * 9),
            currency: "BDT".into(),
            note: "Bet single on 7".into(),
            request_id: request_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn bet_debits_and_pairs_a_ledger_row() {
        let (store, user) = store_with_user(100);

        let placed = store.place_bet(wager(40, None)).await.unwrap();

        assert_eq!(placed.new_balance, Decimal::from(60));
        let transactions = store.transactions_of(&user.id);
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].amount, Decimal::from(-40));
        assert_eq!(transactions[0].reference_id.as_deref(), Some(placed.bet.id.as_str()));

        let stored = store.user("ann@example.com").unwrap();
        assert_eq!(stored.total_bets, 1);
        assert_eq!(stored.transactions.len(), 1);
        assert_eq!(stored.transactions[0].transaction_id, placed.transaction_id);
    }

    #[tokio::test]
    async fn insufficient_funds_write_nothing() {
        let (store, user) = store_with_user(10);

        let result = store.place_bet(wager(11, None)).await;

        assert!(matches!(result, Err(LedgerError::InsufficientFunds)));
        assert!(store.transactions_of(&user.id).is_empty());
        assert!(store.bets_of(&user.id).is_empty());
        assert_eq!(store.user("ann@example.com").unwrap().wallet.main, Decimal::from(10));
    }

    #[tokio::test]
    async fn repeated_request_id_is_not_charged_twice() {
        let (store, user) = store_with_user(100);

        let first = store.place_bet(wager(30, Some("req-7"))).await.unwrap();
        let second = store.place_bet(wager(30, Some("req-7"))).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.bet.id, second.bet.id);
        assert_eq!(first.transaction_id, second.transaction_id);
        assert_eq!(second.new_balance, Decimal::from(70));
        assert_eq!(store.bets_of(&user.id).len(), 1);
    }

    #[tokio::test]
    async fn rejected_withdraw_is_refunded_once() {
        let (store, user) = store_with_user(100);
        let request = NewWithdraw {
            user_email: "ann@example.com".into(),
            agent_email: "agent@example.com".into(),
            method: crate::models::withdrawals::WithdrawMethod::Bkash,
            payment_number: "01700000000".into(),
            amount: Decimal::from(25),
        };

        let (withdraw, balance) = store.create_withdraw(&request, "BDT").await.unwrap();
        assert_eq!(balance, Decimal::from(75));

        store
            .resolve_withdraw(&withdraw.id, WithdrawStatus::Rejected, "BDT")
            .await
            .unwrap();
        let again = store
            .resolve_withdraw(&withdraw.id, WithdrawStatus::Approved, "BDT")
            .await;

        assert!(matches!(again, Err(LedgerError::Conflict(_))));
        assert_eq!(store.user("ann@example.com").unwrap().wallet.main, Decimal::from(100));
        let amounts: Vec<Decimal> = store.transactions_of(&user.id).iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![Decimal::from(-25), Decimal::from(25)]);
    }

    #[tokio::test]
    async fn likes_toggle() {
        let store = MemoryStore::new();
        let agent = User::new("Agent", "agent@example.com", String::new(), Role::Agent, "AGENT001".into());
        store.insert_user(agent.clone()).unwrap();

        assert_eq!(store.toggle_like(&agent.id, "u1").await.unwrap(), Some((true, 1)));
        assert_eq!(store.toggle_like(&agent.id, "u2").await.unwrap(), Some((true, 2)));
        assert_eq!(store.toggle_like(&agent.id, "u1").await.unwrap(), Some((false, 1)));
        assert_eq!(store.toggle_like("missing", "u1").await.unwrap(), None);
    }
}
