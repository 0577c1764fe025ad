use axum::{extract::State, http::StatusCode, response::Response};

use super::{dispatch, success, AgentSession, ApiJson, AppState, UserSession};
use crate::models::withdrawals::{WithdrawCreateRequest, WithdrawStatusRequest};
use crate::models::EmailRequest;
use crate::services::withdrawals::WithdrawRequest;
use crate::services::ServiceError;

pub async fn create(
    State(state): State<AppState>,
    session: UserSession,
    ApiJson(req): ApiJson<WithdrawCreateRequest>,
) -> Result<Response, ServiceError> {
    let withdraw = req.validate().map_err(ServiceError::InvalidInput)?;
    session.ensure_self(&withdraw.user_email)?;

    let created = dispatch(&state.withdraw_channel, |response| WithdrawRequest::Create {
        withdraw,
        response,
    })
    .await?;

    Ok(success(StatusCode::CREATED, Some("Withdraw requested"), created))
}

pub async fn list_for_agent(
    State(state): State<AppState>,
    session: AgentSession,
    ApiJson(req): ApiJson<EmailRequest>,
) -> Result<Response, ServiceError> {
    let email = req.validate().map_err(ServiceError::InvalidInput)?;
    session.ensure_owner(&email)?;

    let withdraws = dispatch(&state.withdraw_channel, |response| {
        WithdrawRequest::ListForAgent { email, response }
    })
    .await?;

    Ok(success(StatusCode::OK, None, withdraws))
}

pub async fn update_status(
    State(state): State<AppState>,
    AgentSession(actor): AgentSession,
    ApiJson(req): ApiJson<WithdrawStatusRequest>,
) -> Result<Response, ServiceError> {
    let (id, status) = req.validate().map_err(ServiceError::InvalidInput)?;

    let withdraw = dispatch(&state.withdraw_channel, |response| {
        WithdrawRequest::UpdateStatus {
            id,
            status,
            actor,
            response,
        }
    })
    .await?;

    Ok(success(StatusCode::OK, Some("Withdraw updated"), withdraw))
}
