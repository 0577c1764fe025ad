use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;

use super::auth::Claims;
use super::{repository_error, Reply, RequestHandler, Service, ServiceError};
use crate::models::users::Role;
use crate::models::withdrawals::{NewWithdraw, Withdraw, WithdrawStatus};
use crate::repositories::users::UserRepository;
use crate::repositories::withdrawals::WithdrawRepository;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawCreated {
    pub withdraw: Withdraw,
    pub new_balance: Decimal,
}

pub enum WithdrawRequest {
    Create {
        withdraw: NewWithdraw,
        response: Reply<WithdrawCreated>,
    },
    ListForAgent {
        email: String,
        response: Reply<Vec<Withdraw>>,
    },
    UpdateStatus {
        id: String,
        status: WithdrawStatus,
        actor: Claims,
        response: Reply<Withdraw>,
    },
}

#[derive(Clone)]
pub struct WithdrawRequestHandler {
    users: Arc<dyn UserRepository>,
    withdrawals: Arc<dyn WithdrawRepository>,
    currency: String,
}

impl WithdrawRequestHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        withdrawals: Arc<dyn WithdrawRepository>,
        currency: String,
    ) -> Self {
        WithdrawRequestHandler {
            users,
            withdrawals,
            currency,
        }
    }

    async fn create(&self, withdraw: NewWithdraw) -> Result<WithdrawCreated, ServiceError> {
        let agent = self
            .users
            .get_user_by_email(&withdraw.agent_email)
            .await
            .map_err(repository_error("get agent"))?
            .ok_or_else(|| ServiceError::NotFound("Agent not found".to_string()))?;
        if agent.role != Role::Agent {
            return Err(ServiceError::InvalidInput(
                "agentEmail must belong to an agent".to_string(),
            ));
        }

        let (created, new_balance) = self
            .withdrawals
            .create_withdraw(&withdraw, &self.currency)
            .await
            .map_err(|e| {
                log::warn!("Withdraw for {} rejected: {}", withdraw.user_email, e);
                ServiceError::from(e)
            })?;

        log::info!(
            "Withdraw {} of {} created for {} via {}",
            created.id,
            created.amount,
            created.user_email,
            created.agent_email
        );
        Ok(WithdrawCreated {
            withdraw: created,
            new_balance,
        })
    }

    async fn update_status(
        &self,
        id: &str,
        status: WithdrawStatus,
        actor: &Claims,
    ) -> Result<Withdraw, ServiceError> {
        let withdraw = self
            .withdrawals
            .get_withdraw(id)
            .await
            .map_err(repository_error("get withdraw"))?
            .ok_or_else(|| ServiceError::NotFound("Withdraw not found".to_string()))?;

        if actor.role != Role::Admin && withdraw.agent_email != actor.email {
            return Err(ServiceError::Forbidden(
                "Withdraw belongs to another agent".to_string(),
            ));
        }

        let resolved = self
            .withdrawals
            .resolve_withdraw(id, status, &self.currency)
            .await?;

        log::info!("Withdraw {} {} by {}", id, status.as_str(), actor.email);
        Ok(resolved)
    }
}

#[async_trait]
impl RequestHandler<WithdrawRequest> for WithdrawRequestHandler {
    async fn handle_request(&self, request: WithdrawRequest) {
        match request {
            WithdrawRequest::Create { withdraw, response } => {
                let result = self.create(withdraw).await;
                let _ = response.send(result);
            }
            WithdrawRequest::ListForAgent { email, response } => {
                let withdraws = self
                    .withdrawals
                    .list_withdraws_for_agent(&email)
                    .await
                    .map_err(repository_error("list withdraws"));
                let _ = response.send(withdraws);
            }
            WithdrawRequest::UpdateStatus {
                id,
                status,
                actor,
                response,
            } => {
                let result = self.update_status(&id, status, &actor).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct WithdrawService;

impl WithdrawService {
    pub fn new() -> Self {
        WithdrawService {}
    }
}

#[async_trait]
impl Service<WithdrawRequest, WithdrawRequestHandler> for WithdrawService {}
