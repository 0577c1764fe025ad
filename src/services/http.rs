use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tokio::sync::{mpsc, oneshot};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::agents::AgentRequest;
use super::auth::{AuthRequest, Claims, TokenKeys};
use super::betting::BettingRequest;
use super::multipliers::MultiplierRequest;
use super::notices::NoticeRequest;
use super::results::ResultRequest;
use super::users::UserRequest;
use super::withdrawals::WithdrawRequest;
use super::{Reply, ServiceError};
use crate::models::users::Role;

mod agents;
mod auth;
mod betting;
mod multipliers;
mod notices;
mod results;
mod users;
mod withdrawals;

pub const SESSION_COOKIE: &str = "auth_token";

#[derive(Clone)]
pub struct AppState {
    pub auth_channel: mpsc::Sender<AuthRequest>,
    pub user_channel: mpsc::Sender<UserRequest>,
    pub betting_channel: mpsc::Sender<BettingRequest>,
    pub multiplier_channel: mpsc::Sender<MultiplierRequest>,
    pub notice_channel: mpsc::Sender<NoticeRequest>,
    pub agent_channel: mpsc::Sender<AgentRequest>,
    pub withdraw_channel: mpsc::Sender<WithdrawRequest>,
    pub result_channel: mpsc::Sender<ResultRequest>,
    pub keys: Arc<TokenKeys>,
    pub secure_cookie: bool,
}

impl ServiceError {
    fn status(&self) -> StatusCode {
        match self {
            ServiceError::InvalidInput(_) | ServiceError::InsufficientFunds => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Configuration(_)
            | ServiceError::Repository(_, _)
            | ServiceError::Communication(_, _)
            | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(json!({
                "success": false,
                "error": self.to_string(),
            })),
        )
            .into_response()
    }
}

/// Error rendered in the `{ok, ...}` shape used by the agent and result routes.
pub struct OkError(ServiceError);

impl From<ServiceError> for OkError {
    fn from(error: ServiceError) -> Self {
        OkError(error)
    }
}

impl IntoResponse for OkError {
    fn into_response(self) -> Response {
        (
            self.0.status(),
            Json(json!({
                "ok": false,
                "error": self.0.to_string(),
            })),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    data: T,
}

fn success<T: Serialize>(status: StatusCode, message: Option<&str>, data: T) -> Response {
    let envelope = Envelope {
        success: true,
        message: message.map(str::to_string),
        data,
    };

    (status, Json(envelope)).into_response()
}

/// JSON body whose rejections are reported as invalid input.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(invalid_body(rejection)),
        }
    }
}

fn invalid_body(rejection: JsonRejection) -> ServiceError {
    ServiceError::InvalidInput(rejection.body_text())
}

/// Sends one request to a service and waits for its answer.
async fn dispatch<R, T>(
    channel: &mpsc::Sender<R>,
    request: impl FnOnce(Reply<T>) -> R,
) -> Result<T, ServiceError> {
    let (response_tx, response_rx) = oneshot::channel();

    channel.send(request(response_tx)).await.map_err(|e| {
        ServiceError::Communication("Failed to process request".to_string(), e.to_string())
    })?;

    response_rx.await.map_err(|e| {
        ServiceError::Communication("Failed to receive response".to_string(), e.to_string())
    })?
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            pair.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_string)
        })
        .filter(|token| !token.is_empty())
}

fn session_claims(parts: &Parts, state: &AppState) -> Result<Claims, ServiceError> {
    let token = session_token(&parts.headers)
        .ok_or_else(|| ServiceError::Unauthorized("Not signed in".to_string()))?;

    state.keys.verify(&token)
}

/// Signed-in administrator.
pub struct AdminSession(pub Claims);

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = session_claims(parts, state)?;
        if claims.role != Role::Admin {
            return Err(ServiceError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminSession(claims))
    }
}

/// Any signed-in account.
pub struct UserSession(pub Claims);

impl UserSession {
    /// The session may only act on its own account.
    fn ensure_self(&self, email: &str) -> Result<(), ServiceError> {
        if self.0.email != email {
            return Err(ServiceError::Forbidden(
                "You may only manage your own account".to_string(),
            ));
        }
        Ok(())
    }
}

impl FromRequestParts<AppState> for UserSession {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        session_claims(parts, state).map(UserSession)
    }
}

/// Signed-in agent or administrator.
pub struct AgentSession(pub Claims);

impl AgentSession {
    /// Agents may only act on their own account.
    fn ensure_owner(&self, email: &str) -> Result<(), ServiceError> {
        if self.0.role == Role::Agent && self.0.email != email {
            return Err(ServiceError::Forbidden(
                "Agents may only manage their own account".to_string(),
            ));
        }
        Ok(())
    }
}

impl FromRequestParts<AppState> for AgentSession {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = session_claims(parts, state)?;
        if !matches!(claims.role, Role::Agent | Role::Admin) {
            return Err(ServiceError::Forbidden("Agent access required".to_string()));
        }

        Ok(AgentSession(claims))
    }
}

fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let origin = match origin.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(e) => {
            log::warn!("Ignoring invalid CORS origin {}: {}", origin, e);
            return None;
        }
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

pub fn router(state: AppState, cors_origin: Option<&str>) -> Router {
    let api = Router::new()
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-out", post(auth::sign_out))
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/send-otp", post(auth::send_otp))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/users/wallet", post(users::wallet))
        .route("/users/profile", post(users::profile))
        .route("/users/update-profile", post(users::update_profile))
        .route("/users/query", post(users::query))
        .route("/users/referrals", post(users::referrals))
        .route("/users/transactions", post(users::transactions))
        .route("/betting-post-api", post(betting::place_bet))
        .route("/bets/history", post(betting::history))
        .route(
            "/multipliers",
            get(multipliers::list).post(multipliers::create),
        )
        .route("/multipliers/update", patch(multipliers::upsert))
        .route("/multipliers/{id}", delete(multipliers::remove))
        .route("/notices", get(notices::list).post(notices::create))
        .route("/notices/{id}", delete(notices::remove))
        .route("/agents", get(agents::list).post(agents::toggle_like))
        .route("/agents/links", post(agents::set_link))
        .route("/withdraw", post(withdrawals::create))
        .route("/withdraw/agent", post(withdrawals::list_for_agent))
        .route("/withdraw/status", patch(withdrawals::update_status))
        .route("/results/show", get(results::show))
        .route("/results", post(results::publish))
        .route("/growth", get(results::growth));

    let mut app = Router::new()
        .nest("/api", api)
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = cors_origin.and_then(cors_layer) {
        app = app.layer(cors);
    }

    app
}

pub async fn serve(app: Router, listen: &str) -> Result<(), anyhow::Error> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
