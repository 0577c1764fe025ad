use crate::models::transactions::{Transaction, TransactionType};
use crate::models::users::{
    AgentLink, BankHold, NewUser, ProfileUpdate, Role, TransactionPointer, User, UserCategory,
    UserQuery, Wallet,
};

use super::{unique_violation, LedgerError};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{types::Json, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error>;

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, anyhow::Error>;

    async fn get_user_by_referral_code(&self, code: &str) -> Result<Option<User>, anyhow::Error>;

    /// Creates a confirmed account, links it to its referrer and books the
    /// signup bonus, all in one unit.
    async fn create_user(&self, user: NewUser) -> Result<User, LedgerError>;

    async fn update_profile(
        &self,
        email: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, anyhow::Error>;

    async fn set_online(&self, email: &str, online: bool) -> Result<(), anyhow::Error>;

    /// One page of users plus the total match count.
    async fn query_users(&self, query: &UserQuery) -> Result<(Vec<User>, i64), anyhow::Error>;

    async fn list_referrals(&self, user_id: &str) -> Result<Vec<User>, anyhow::Error>;

    async fn list_agents(&self) -> Result<Vec<User>, anyhow::Error>;

    /// Adds or removes `user_id` from the agent's likes. `None` when the agent is unknown.
    async fn toggle_like(
        &self,
        agent_id: &str,
        user_id: &str,
    ) -> Result<Option<(bool, i64)>, anyhow::Error>;

    /// Sets the link with the same title, replacing any previous one.
    async fn set_agent_link(
        &self,
        email: &str,
        link: &AgentLink,
    ) -> Result<Option<Vec<AgentLink>>, anyhow::Error>;
}

pub(crate) const USER_COLUMNS: &str = "id, name, email, password_hash, role, phone, avatar, \
    wallet_main, wallet_bonus, wallet_referral, bank_amount, bank_request_time, \
    bank_valid_transfer_time, total_bets, total_wins, total_bet_amount, total_win_amount, \
    referral_code, referred_by, my_refer_list, likes, like_count, links, transaction_refs, \
    is_online, is_active, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    id: String,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    phone: Option<String>,
    avatar: Option<String>,
    wallet_main: Decimal,
    wallet_bonus: Decimal,
    wallet_referral: Decimal,
    bank_amount: Decimal,
    bank_request_time: Option<DateTime<Utc>>,
    bank_valid_transfer_time: Option<DateTime<Utc>>,
    total_bets: i64,
    total_wins: i64,
    total_bet_amount: Decimal,
    total_win_amount: Decimal,
    referral_code: String,
    referred_by: Option<String>,
    my_refer_list: Vec<String>,
    likes: Vec<String>,
    like_count: i64,
    links: Json<Vec<AgentLink>>,
    transaction_refs: Json<Vec<TransactionPointer>>,
    is_online: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = anyhow::Error;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row.role.parse::<Role>().map_err(|e| anyhow!(e))?;

        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            role,
            phone: row.phone,
            avatar: row.avatar,
            wallet: Wallet {
                main: row.wallet_main,
                bonus: row.wallet_bonus,
                referral: row.wallet_referral,
                bank: BankHold {
                    amount: row.bank_amount,
                    request_time: row.bank_request_time,
                    valid_transfer_time: row.bank_valid_transfer_time,
                },
            },
            total_bets: row.total_bets,
            total_wins: row.total_wins,
            total_bet_amount: row.total_bet_amount,
            total_win_amount: row.total_win_amount,
            referral_code: row.referral_code,
            referred_by: row.referred_by,
            my_refer_list: row.my_refer_list,
            likes: row.likes,
            like_count: row.like_count,
            link: row.links.0,
            transactions: row.transaction_refs.0,
            is_online: row.is_online,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_users(rows: Vec<UserRow>) -> Result<Vec<User>, anyhow::Error> {
    rows.into_iter().map(User::try_from).collect()
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &UserQuery) {
    builder.push(" WHERE 1 = 1");
    if !query.search.is_empty() {
        let escaped = query
            .search
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        builder
            .push(" AND email ILIKE ")
            .push_bind(format!("%{}%", escaped));
    }
    if let Some(role) = query.category.role() {
        builder.push(" AND role = ").push_bind(role.as_str());
    }
}

fn order_clause(category: UserCategory) -> &'static str {
    match category {
        UserCategory::Oldest => " ORDER BY created_at ASC, id ASC",
        UserCategory::Balance => " ORDER BY wallet_main DESC, created_at DESC, id ASC",
        _ => " ORDER BY created_at DESC, id ASC",
    }
}

#[derive(Clone)]
pub struct PgUserRepository {
    conn: PgPool,
}

impl PgUserRepository {
    pub fn new(conn: PgPool) -> Self {
        Self { conn }
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<User>, anyhow::Error> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE {} = $1",
            USER_COLUMNS, column
        ))
        .bind(value)
        .fetch_optional(&self.conn)
        .await?;

        row.map(User::try_from).transpose()
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, anyhow::Error> {
        self.fetch_one_by("email", email).await
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, anyhow::Error> {
        self.fetch_one_by("id", id).await
    }

    async fn get_user_by_referral_code(&self, code: &str) -> Result<Option<User>, anyhow::Error> {
        self.fetch_one_by("referral_code", code).await
    }

    async fn create_user(&self, new_user: NewUser) -> Result<User, LedgerError> {
        let user_id = Uuid::new_v4().hyphenated().to_string();
        let mut tx = self.conn.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
                INSERT INTO users (id, name, email, password_hash, role, referral_code, referred_by, wallet_bonus)
                VALUES ($1, $2, $3, $4, 'user', $5, $6, $7)
                RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user_id)
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.referral_code)
        .bind(&new_user.referred_by)
        .bind(new_user.signup_bonus)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| unique_violation(e, "User already exists"))?;

        if let Some(referrer) = &new_user.referred_by {
            sqlx::query(
                "UPDATE users SET my_refer_list = array_append(my_refer_list, $1), updated_at = now() WHERE id = $2",
            )
            .bind(&user_id)
            .bind(referrer)
            .execute(&mut *tx)
            .await?;
        }

        let mut user = User::try_from(row)?;

        if new_user.signup_bonus > Decimal::ZERO {
            let transaction = Transaction::new(
                &user_id,
                TransactionType::SignupBonus,
                new_user.signup_bonus,
                &new_user.currency,
                None,
                "Signup bonus".to_string(),
            );
            super::transactions::insert_transaction(&mut tx, &transaction).await?;

            let pointer = TransactionPointer {
                transaction_id: transaction.id.clone(),
                created_at: transaction.created_at,
            };
            super::transactions::append_pointer(&mut tx, &user_id, &pointer).await?;
            user.transactions.push(pointer);
        }

        tx.commit().await?;

        Ok(user)
    }

    async fn update_profile(
        &self,
        email: &str,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, anyhow::Error> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
                UPDATE users SET
                    name = COALESCE($1, name),
                    phone = COALESCE($2, phone),
                    avatar = COALESCE($3, avatar),
                    updated_at = now()
                WHERE email = $4
                RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&update.name)
        .bind(&update.phone)
        .bind(&update.avatar)
        .bind(email)
        .fetch_optional(&self.conn)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn set_online(&self, email: &str, online: bool) -> Result<(), anyhow::Error> {
        sqlx::query("UPDATE users SET is_online = $1 WHERE email = $2")
            .bind(online)
            .bind(email)
            .execute(&self.conn)
            .await?;

        Ok(())
    }

    async fn query_users(&self, query: &UserQuery) -> Result<(Vec<User>, i64), anyhow::Error> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(1) FROM users");
        push_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.conn).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        push_filters(&mut select, query);
        select.push(order_clause(query.category));
        select
            .push(" LIMIT ")
            .push_bind(i64::from(query.page.limit))
            .push(" OFFSET ")
            .push_bind(query.page.offset() as i64);

        let rows = select
            .build_query_as::<UserRow>()
            .fetch_all(&self.conn)
            .await?;

        Ok((into_users(rows)?, total))
    }

    async fn list_referrals(&self, user_id: &str) -> Result<Vec<User>, anyhow::Error> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE referred_by = $1 ORDER BY created_at DESC",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.conn)
        .await?;

        into_users(rows)
    }

    async fn list_agents(&self) -> Result<Vec<User>, anyhow::Error> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE role = 'agent' AND is_active ORDER BY like_count DESC, name ASC",
            USER_COLUMNS
        ))
        .fetch_all(&self.conn)
        .await?;

        into_users(rows)
    }

    async fn toggle_like(
        &self,
        agent_id: &str,
        user_id: &str,
    ) -> Result<Option<(bool, i64)>, anyhow::Error> {
        let mut tx = self.conn.begin().await?;

        let likes: Option<Vec<String>> =
            sqlx::query_scalar("SELECT likes FROM users WHERE id = $1 FOR UPDATE")
                .bind(agent_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(likes) = likes else {
            return Ok(None);
        };

        let liked = !likes.iter().any(|id| id == user_id);
        let sql = if liked {
            "UPDATE users SET likes = array_append(likes, $1), like_count = cardinality(array_append(likes, $1)), updated_at = now() WHERE id = $2 RETURNING like_count"
        } else {
            "UPDATE users SET likes = array_remove(likes, $1), like_count = cardinality(array_remove(likes, $1)), updated_at = now() WHERE id = $2 RETURNING like_count"
        };

        let like_count: i64 = sqlx::query_scalar(sql)
            .bind(user_id)
            .bind(agent_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some((liked, like_count)))
    }

    async fn set_agent_link(
        &self,
        email: &str,
        link: &AgentLink,
    ) -> Result<Option<Vec<AgentLink>>, anyhow::Error> {
        let mut tx = self.conn.begin().await?;

        let current: Option<Json<Vec<AgentLink>>> =
            sqlx::query_scalar("SELECT links FROM users WHERE email = $1 FOR UPDATE")
                .bind(email)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(Json(mut links)) = current else {
            return Ok(None);
        };

        links.retain(|existing| existing.title != link.title);
        links.push(link.clone());

        sqlx::query("UPDATE users SET links = $1, updated_at = now() WHERE email = $2")
            .bind(Json(&links))
            .bind(email)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(Some(links))
    }
}
