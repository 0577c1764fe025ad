use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::{repository_error, Reply, RequestHandler, Service, ServiceError};
use crate::models::users::{AgentCard, AgentLink, Role, User};
use crate::repositories::users::UserRepository;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggled {
    pub liked: bool,
    pub like_count: i64,
}

pub enum AgentRequest {
    List {
        response: Reply<Vec<AgentCard>>,
    },
    ToggleLike {
        agent_id: String,
        user_email: String,
        response: Reply<LikeToggled>,
    },
    SetLink {
        email: String,
        link: AgentLink,
        response: Reply<Vec<AgentLink>>,
    },
}

#[derive(Clone)]
pub struct AgentRequestHandler {
    users: Arc<dyn UserRepository>,
}

impl AgentRequestHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        AgentRequestHandler { users }
    }

    async fn list(&self) -> Result<Vec<AgentCard>, ServiceError> {
        let agents = self
            .users
            .list_agents()
            .await
            .map_err(repository_error("list agents"))?;

        Ok(agents.into_iter().map(AgentCard::from).collect())
    }

    fn require_agent(user: Option<User>) -> Result<User, ServiceError> {
        let agent = user.ok_or_else(|| ServiceError::NotFound("Agent not found".to_string()))?;
        if agent.role != Role::Agent {
            return Err(ServiceError::InvalidInput("Target user is not an agent".to_string()));
        }
        Ok(agent)
    }

    async fn toggle_like(&self, agent_id: &str, user_email: &str) -> Result<LikeToggled, ServiceError> {
        let user = self
            .users
            .get_user_by_email(user_email)
            .await
            .map_err(repository_error("get user"))?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;
        let agent = Self::require_agent(
            self.users
                .get_user_by_id(agent_id)
                .await
                .map_err(repository_error("get agent"))?,
        )?;

        let (liked, like_count) = self
            .users
            .toggle_like(&agent.id, &user.id)
            .await
            .map_err(repository_error("toggle like"))?
            .ok_or_else(|| ServiceError::NotFound("Agent not found".to_string()))?;

        Ok(LikeToggled { liked, like_count })
    }

    async fn set_link(&self, email: &str, link: &AgentLink) -> Result<Vec<AgentLink>, ServiceError> {
        Self::require_agent(
            self.users
                .get_user_by_email(email)
                .await
                .map_err(repository_error("get agent"))?,
        )?;

        self.users
            .set_agent_link(email, link)
            .await
            .map_err(repository_error("set agent link"))?
            .ok_or_else(|| ServiceError::NotFound("Agent not found".to_string()))
    }
}

#[async_trait]
impl RequestHandler<AgentRequest> for AgentRequestHandler {
    async fn handle_request(&self, request: AgentRequest) {
        match request {
            AgentRequest::List { response } => {
                let agents = self.list().await;
                let _ = response.send(agents);
            }
            AgentRequest::ToggleLike {
                agent_id,
                user_email,
                response,
            } => {
                let result = self.toggle_like(&agent_id, &user_email).await;
                let _ = response.send(result);
            }
            AgentRequest::SetLink {
                email,
                link,
                response,
            } => {
                let result = self.set_link(&email, &link).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct AgentService;

impl AgentService {
    pub fn new() -> Self {
        AgentService {}
    }
}

#[async_trait]
impl Service<AgentRequest, AgentRequestHandler> for AgentService {}
