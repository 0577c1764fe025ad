use std::sync::Arc;

use async_trait::async_trait;

use super::{repository_error, Reply, RequestHandler, Service, ServiceError};
use crate::cache::{self, QueryCache};
use crate::models::transactions::Transaction;
use crate::models::users::{
    MultiplierBoard, ProfileUpdate, ReferralEntry, ReferralSummary, User, UserPage, UserProfile,
    UserQuery, WalletSummary,
};
use crate::models::Page;
use crate::repositories::multipliers::MultiplierRepository;
use crate::repositories::transactions::TransactionRepository;
use crate::repositories::users::UserRepository;

pub enum UserRequest {
    GetWallet {
        email: String,
        response: Reply<WalletSummary>,
    },
    GetProfile {
        email: String,
        response: Reply<UserProfile>,
    },
    UpdateProfile {
        email: String,
        update: ProfileUpdate,
        response: Reply<UserProfile>,
    },
    /// Answers with the serialized listing, straight from the cache when possible.
    Query {
        query: UserQuery,
        response: Reply<Vec<u8>>,
    },
    GetReferrals {
        email: String,
        response: Reply<ReferralSummary>,
    },
    GetTransactions {
        email: String,
        page: Page,
        response: Reply<Vec<Transaction>>,
    },
}

#[derive(Clone)]
pub struct UserRequestHandler {
    users: Arc<dyn UserRepository>,
    multipliers: Arc<dyn MultiplierRepository>,
    transactions: Arc<dyn TransactionRepository>,
    cache: Arc<QueryCache>,
}

impl UserRequestHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        multipliers: Arc<dyn MultiplierRepository>,
        transactions: Arc<dyn TransactionRepository>,
        cache: Arc<QueryCache>,
    ) -> Self {
        UserRequestHandler {
            users,
            multipliers,
            transactions,
            cache,
        }
    }

    async fn user(&self, email: &str) -> Result<User, ServiceError> {
        self.users
            .get_user_by_email(email)
            .await
            .map_err(repository_error("get user"))?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))
    }

    async fn get_wallet(&self, email: &str) -> Result<WalletSummary, ServiceError> {
        let user = self.user(email).await?;
        let multipliers = self
            .multipliers
            .list_multipliers()
            .await
            .map_err(repository_error("list multipliers"))?;

        Ok(WalletSummary {
            wallet_balance: user.wallet.main,
            wallet: user.wallet,
            results: MultiplierBoard::from_multipliers(&multipliers),
        })
    }

    async fn update_profile(
        &self,
        email: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, ServiceError> {
        let user = self
            .users
            .update_profile(email, update)
            .await
            .map_err(repository_error("update profile"))?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        Ok(UserProfile::from(user))
    }

    async fn query(&self, query: &UserQuery) -> Result<Vec<u8>, ServiceError> {
        let key = cache::query_key(query);
        if let Some(body) = self.cache.get(&key).await {
            log::debug!("User query served from cache: {}", query.canonical());
            return Ok(body);
        }

        let (users, total) = self
            .users
            .query_users(query)
            .await
            .map_err(repository_error("query users"))?;
        let page = UserPage {
            success: true,
            data: users,
            page: query.page.page,
            limit: query.page.limit,
            total,
        };
        let body = serde_json::to_vec(&page).map_err(|e| ServiceError::Internal(e.to_string()))?;

        self.cache.set(&key, &body).await;
        Ok(body)
    }

    async fn get_referrals(&self, email: &str) -> Result<ReferralSummary, ServiceError> {
        let user = self.user(email).await?;
        let referrals = self
            .users
            .list_referrals(&user.id)
            .await
            .map_err(repository_error("list referrals"))?;

        Ok(ReferralSummary {
            referral_code: user.referral_code,
            total: referrals.len(),
            referrals: referrals
                .into_iter()
                .map(|r| ReferralEntry {
                    name: r.name,
                    email: r.email,
                    created_at: r.created_at,
                })
                .collect(),
        })
    }

    async fn get_transactions(&self, email: &str, page: Page) -> Result<Vec<Transaction>, ServiceError> {
        let user = self.user(email).await?;
        self.transactions
            .list_transactions(&user.id, page)
            .await
            .map_err(repository_error("list transactions"))
    }
}

#[async_trait]
impl RequestHandler<UserRequest> for UserRequestHandler {
    async fn handle_request(&self, request: UserRequest) {
        match request {
            UserRequest::GetWallet { email, response } => {
                let wallet = self.get_wallet(&email).await;
                let _ = response.send(wallet);
            }
            UserRequest::GetProfile { email, response } => {
                let profile = self.user(&email).await.map(UserProfile::from);
                let _ = response.send(profile);
            }
            UserRequest::UpdateProfile {
                email,
                update,
                response,
            } => {
                let profile = self.update_profile(&email, &update).await;
                let _ = response.send(profile);
            }
            UserRequest::Query { query, response } => {
                let body = self.query(&query).await;
                let _ = response.send(body);
            }
            UserRequest::GetReferrals { email, response } => {
                let referrals = self.get_referrals(&email).await;
                let _ = response.send(referrals);
            }
            UserRequest::GetTransactions {
                email,
                page,
                response,
            } => {
                let transactions = self.get_transactions(&email, page).await;
                let _ = response.send(transactions);
            }
        }
    }
}

pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        UserService {}
    }
}

#[async_trait]
impl Service<UserRequest, UserRequestHandler> for UserService {}
