use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::{dispatch, success, AdminSession, ApiJson, AppState, OkError};
use crate::models::results::PublishResultRequest;
use crate::services::results::ResultRequest;
use crate::services::ServiceError;

pub async fn show(State(state): State<AppState>) -> Result<Response, OkError> {
    let board = dispatch(&state.result_channel, |response| ResultRequest::Show { response }).await?;

    Ok(Json(json!({
        "ok": true,
        "current": board.current,
        "history": board.history,
    }))
    .into_response())
}

pub async fn publish(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(req): ApiJson<PublishResultRequest>,
) -> Result<Response, OkError> {
    let result = req.validate().map_err(ServiceError::InvalidInput)?;

    let published = dispatch(&state.result_channel, |response| ResultRequest::Publish {
        result,
        response,
    })
    .await?;

    Ok(Json(json!({ "ok": true, "result": published })).into_response())
}

pub async fn growth(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let growth = dispatch(&state.result_channel, |response| ResultRequest::LatestGrowth {
        response,
    })
    .await?;

    Ok(success(StatusCode::OK, None, growth))
}
