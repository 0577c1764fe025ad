use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use super::{dispatch, success, ApiJson, AppState, UserSession};
use crate::models::users::{UpdateProfileRequest, UserQueryRequest};
use crate::models::{EmailRequest, PagedEmailRequest};
use crate::services::users::UserRequest;
use crate::services::ServiceError;

pub async fn wallet(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> Result<Response, ServiceError> {
    let email = req.validate().map_err(ServiceError::InvalidInput)?;

    let wallet = dispatch(&state.user_channel, |response| UserRequest::GetWallet {
        email,
        response,
    })
    .await?;

    Ok(success(StatusCode::OK, None, wallet))
}

pub async fn profile(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> Result<Response, ServiceError> {
    let email = req.validate().map_err(ServiceError::InvalidInput)?;

    let profile = dispatch(&state.user_channel, |response| UserRequest::GetProfile {
        email,
        response,
    })
    .await?;

    Ok(success(StatusCode::OK, None, profile))
}

pub async fn update_profile(
    State(state): State<AppState>,
    session: UserSession,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> Result<Response, ServiceError> {
    let (email, update) = req.validate().map_err(ServiceError::InvalidInput)?;
    session.ensure_self(&email)?;

    let profile = dispatch(&state.user_channel, |response| UserRequest::UpdateProfile {
        email,
        update,
        response,
    })
    .await?;

    Ok(success(StatusCode::OK, Some("Profile updated"), profile))
}

/// The body is already a complete envelope, possibly straight from the cache.
pub async fn query(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UserQueryRequest>,
) -> Result<Response, ServiceError> {
    let query = req.validate().map_err(ServiceError::InvalidInput)?;

    let body = dispatch(&state.user_channel, |response| UserRequest::Query {
        query,
        response,
    })
    .await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}

pub async fn referrals(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> Result<Response, ServiceError> {
    let email = req.validate().map_err(ServiceError::InvalidInput)?;

    let referrals = dispatch(&state.user_channel, |response| UserRequest::GetReferrals {
        email,
        response,
    })
    .await?;

    Ok(success(StatusCode::OK, None, referrals))
}

pub async fn transactions(
    State(state): State<AppState>,
    session: UserSession,
    ApiJson(req): ApiJson<PagedEmailRequest>,
) -> Result<Response, ServiceError> {
    let (email, page) = req.validate().map_err(ServiceError::InvalidInput)?;
    session.ensure_self(&email)?;

    let transactions = dispatch(&state.user_channel, |response| {
        UserRequest::GetTransactions {
            email,
            page,
            response,
        }
    })
    .await?;

    Ok(success(StatusCode::OK, None, transactions))
}
