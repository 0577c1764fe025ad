use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use super::{dispatch, AgentSession, ApiJson, AppState, OkError};
use crate::models::users::{SetLinkRequest, ToggleLikeRequest};
use crate::services::agents::AgentRequest;
use crate::services::ServiceError;

pub async fn list(State(state): State<AppState>) -> Result<Response, OkError> {
    let agents = dispatch(&state.agent_channel, |response| AgentRequest::List { response }).await?;

    Ok(Json(json!({ "ok": true, "agents": agents })).into_response())
}

pub async fn toggle_like(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ToggleLikeRequest>,
) -> Result<Response, OkError> {
    let (agent_id, user_email) = req.validate().map_err(ServiceError::InvalidInput)?;

    let toggled = dispatch(&state.agent_channel, |response| AgentRequest::ToggleLike {
        agent_id,
        user_email,
        response,
    })
    .await?;

    Ok(Json(json!({
        "ok": true,
        "liked": toggled.liked,
        "likeCount": toggled.like_count,
    }))
    .into_response())
}

pub async fn set_link(
    State(state): State<AppState>,
    session: AgentSession,
    ApiJson(req): ApiJson<SetLinkRequest>,
) -> Result<Response, OkError> {
    let (email, link) = req.validate().map_err(ServiceError::InvalidInput)?;
    session.ensure_owner(&email)?;

    let links = dispatch(&state.agent_channel, |response| AgentRequest::SetLink {
        email,
        link,
        response,
    })
    .await?;

    Ok(Json(json!({ "ok": true, "link": links })).into_response())
}
