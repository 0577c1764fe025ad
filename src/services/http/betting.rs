use axum::{extract::State, http::StatusCode, response::Response};

use super::{dispatch, success, ApiJson, AppState};
use crate::models::bets::PlaceBetRequest;
use crate::models::PagedEmailRequest;
use crate::services::betting::BettingRequest;
use crate::services::ServiceError;

pub async fn place_bet(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PlaceBetRequest>,
) -> Result<Response, ServiceError> {
    let slip = req.validate().map_err(ServiceError::InvalidInput)?;

    let receipt = dispatch(&state.betting_channel, |response| BettingRequest::PlaceBet {
        slip,
        response,
    })
    .await?;

    let status = if receipt.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok(success(status, Some("Bet placed"), receipt))
}

pub async fn history(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<PagedEmailRequest>,
) -> Result<Response, ServiceError> {
    let (email, page) = req.validate().map_err(ServiceError::InvalidInput)?;

    let bets = dispatch(&state.betting_channel, |response| BettingRequest::GetHistory {
        email,
        page,
        response,
    })
    .await?;

    Ok(success(StatusCode::OK, None, bets))
}
