use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};

use super::{dispatch, success, AdminSession, ApiJson, AppState};
use crate::models::multipliers::MultiplierRequest as MultiplierBody;
use crate::services::multipliers::MultiplierRequest;
use crate::services::ServiceError;

pub async fn list(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let multipliers =
        dispatch(&state.multiplier_channel, |response| MultiplierRequest::List { response })
            .await?;

    Ok(success(StatusCode::OK, None, multipliers))
}

pub async fn create(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(req): ApiJson<MultiplierBody>,
) -> Result<Response, ServiceError> {
    let (name, value) = req.validate().map_err(ServiceError::InvalidInput)?;

    let multiplier = dispatch(&state.multiplier_channel, |response| {
        MultiplierRequest::Create {
            name,
            value,
            response,
        }
    })
    .await?;

    Ok(success(StatusCode::CREATED, Some("Multiplier created"), multiplier))
}

pub async fn upsert(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(req): ApiJson<MultiplierBody>,
) -> Result<Response, ServiceError> {
    let (name, value) = req.validate().map_err(ServiceError::InvalidInput)?;

    let multiplier = dispatch(&state.multiplier_channel, |response| {
        MultiplierRequest::Upsert {
            name,
            value,
            response,
        }
    })
    .await?;

    Ok(success(StatusCode::OK, Some("Multiplier saved"), multiplier))
}

pub async fn remove(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let id = dispatch(&state.multiplier_channel, |response| MultiplierRequest::Delete {
        id,
        response,
    })
    .await?;

    Ok(success(StatusCode::OK, Some("Multiplier deleted"), id))
}
