use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use tokio::sync::{mpsc, oneshot};

use crate::cache::QueryCache;
use crate::mailer::{self, OtpMailer};
use crate::repositories::{LedgerError, Repositories};
use crate::settings::Settings;

pub mod agents;
pub mod auth;
pub mod betting;
pub mod http;
pub mod multipliers;
pub mod notices;
pub mod results;
pub mod users;
pub mod withdrawals;

const CHANNEL_CAPACITY: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Insufficient balance")]
    InsufficientFunds,
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Repository error: {0} - {1}")]
    Repository(String, String),
    #[error("Communication error: {0} - {1}")]
    Communication(String, String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<LedgerError> for ServiceError {
    fn from(error: LedgerError) -> Self {
        match error {
            LedgerError::NotFound(what) => ServiceError::NotFound(format!("{} not found", what)),
            LedgerError::InsufficientFunds => ServiceError::InsufficientFunds,
            LedgerError::Conflict(message) => ServiceError::Conflict(message),
            LedgerError::Database(e) => {
                log::error!("Ledger database error: {}", e);
                ServiceError::Repository("ledger".to_string(), e.to_string())
            }
            LedgerError::Storage(e) => {
                log::error!("Ledger storage error: {}", e);
                ServiceError::Repository("ledger".to_string(), e.to_string())
            }
        }
    }
}

/// Maps an infrastructure failure to a repository error, logging it once.
fn repository_error(context: &'static str) -> impl FnOnce(anyhow::Error) -> ServiceError {
    move |e| {
        log::error!("{} failed: {}", context, e);
        ServiceError::Repository(context.to_string(), e.to_string())
    }
}

pub type Reply<T> = oneshot::Sender<Result<T, ServiceError>>;

#[async_trait]
pub trait RequestHandler<T>: Send + Sync + 'static
where
    T: Send + 'static,
{
    async fn handle_request(&self, request: T);
}

#[async_trait]
pub trait Service<T, H>: Send + Sync + 'static
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
{
    async fn run(&mut self, handler: H, receiver: &mut mpsc::Receiver<T>) {
        while let Some(request) = receiver.recv().await {
            let handler = handler.clone();

            tokio::spawn(async move {
                handler.handle_request(request).await;
            });
        }
    }
}

fn launch<T, H, S>(name: &str, mut service: S, handler: H) -> mpsc::Sender<T>
where
    T: Send + 'static,
    H: RequestHandler<T> + Clone + Send,
    S: Service<T, H>,
{
    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);

    log::info!("Starting {} service.", name);
    tokio::spawn(async move {
        service.run(handler, &mut rx).await;
    });

    tx
}

/// Starts every service actor and returns the state the HTTP layer talks to.
pub fn spawn_services(
    repositories: Repositories,
    cache: QueryCache,
    mailer: Arc<dyn OtpMailer>,
    settings: &Settings,
) -> http::AppState {
    let keys = Arc::new(auth::TokenKeys::new(
        &settings.auth.jwt_secret,
        settings.auth.token_ttl_days,
    ));
    let currency = settings.wallet.currency.clone();

    let auth_channel = launch(
        "auth",
        auth::AuthService::new(),
        auth::AuthRequestHandler::new(
            repositories.users.clone(),
            repositories.temp_users.clone(),
            mailer,
            keys.clone(),
            settings,
        ),
    );

    let user_channel = launch(
        "user",
        users::UserService::new(),
        users::UserRequestHandler::new(
            repositories.users.clone(),
            repositories.multipliers.clone(),
            repositories.transactions.clone(),
            Arc::new(cache),
        ),
    );

    let betting_channel = launch(
        "betting",
        betting::BettingService::new(),
        betting::BettingRequestHandler::new(
            repositories.users.clone(),
            repositories.bets.clone(),
            repositories.multipliers.clone(),
            currency.clone(),
        ),
    );

    let multiplier_channel = launch(
        "multiplier",
        multipliers::MultiplierService::new(),
        multipliers::MultiplierRequestHandler::new(repositories.multipliers.clone()),
    );

    let notice_channel = launch(
        "notice",
        notices::NoticeService::new(),
        notices::NoticeRequestHandler::new(repositories.notices.clone()),
    );

    let agent_channel = launch(
        "agent",
        agents::AgentService::new(),
        agents::AgentRequestHandler::new(repositories.users.clone()),
    );

    let withdraw_channel = launch(
        "withdraw",
        withdrawals::WithdrawService::new(),
        withdrawals::WithdrawRequestHandler::new(
            repositories.users.clone(),
            repositories.withdrawals.clone(),
            currency,
        ),
    );

    let result_channel = launch(
        "result",
        results::ResultService::new(),
        results::ResultRequestHandler::new(repositories.results.clone()),
    );

    http::AppState {
        auth_channel,
        user_channel,
        betting_channel,
        multiplier_channel,
        notice_channel,
        agent_channel,
        withdraw_channel,
        result_channel,
        keys,
        secure_cookie: settings.auth.secure_cookie,
    }
}

/// Builds the full application router with its services running.
pub fn build_app(
    repositories: Repositories,
    cache: QueryCache,
    mailer: Arc<dyn OtpMailer>,
    settings: &Settings,
) -> Router {
    let state = spawn_services(repositories, cache, mailer, settings);
    http::router(state, settings.server.cors_origin.as_deref())
}

pub async fn start_services(
    repositories: Repositories,
    settings: Settings,
) -> Result<(), anyhow::Error> {
    let cache = QueryCache::from_settings(&settings.cache)?;
    let mailer = mailer::from_settings(&settings.mailer);
    let app = build_app(repositories, cache, mailer, &settings);

    log::info!("Starting HTTP server.");
    http::serve(app, &settings.server.listen).await
}
