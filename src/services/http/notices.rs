use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};

use super::{dispatch, success, AdminSession, ApiJson, AppState};
use crate::models::notices::NoticeRequest as NoticeBody;
use crate::services::notices::NoticeRequest;
use crate::services::ServiceError;

pub async fn list(State(state): State<AppState>) -> Result<Response, ServiceError> {
    let notices = dispatch(&state.notice_channel, |response| NoticeRequest::List { response })
        .await?;

    Ok(success(StatusCode::OK, None, notices))
}

pub async fn create(
    State(state): State<AppState>,
    _admin: AdminSession,
    ApiJson(req): ApiJson<NoticeBody>,
) -> Result<Response, ServiceError> {
    let message = req.validate().map_err(ServiceError::InvalidInput)?;

    let notice = dispatch(&state.notice_channel, |response| NoticeRequest::Create {
        message,
        response,
    })
    .await?;

    Ok(success(StatusCode::CREATED, Some("Notice created"), notice))
}

pub async fn remove(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<String>,
) -> Result<Response, ServiceError> {
    let id = dispatch(&state.notice_channel, |response| NoticeRequest::Delete {
        id,
        response,
    })
    .await?;

    Ok(success(StatusCode::OK, Some("Notice deleted"), id))
}
