use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{repository_error, Reply, RequestHandler, Service, ServiceError};
use crate::models::multipliers::{BetType, Multiplier};
use crate::repositories::multipliers::MultiplierRepository;

pub enum MultiplierRequest {
    List {
        response: Reply<Vec<Multiplier>>,
    },
    Create {
        name: BetType,
        value: Decimal,
        response: Reply<Multiplier>,
    },
    Upsert {
        name: BetType,
        value: Decimal,
        response: Reply<Multiplier>,
    },
    Delete {
        id: String,
        response: Reply<String>,
    },
}

#[derive(Clone)]
pub struct MultiplierRequestHandler {
    multipliers: Arc<dyn MultiplierRepository>,
}

impl MultiplierRequestHandler {
    pub fn new(multipliers: Arc<dyn MultiplierRepository>) -> Self {
        MultiplierRequestHandler { multipliers }
    }

    async fn create(&self, name: BetType, value: Decimal) -> Result<Multiplier, ServiceError> {
        let created = self
            .multipliers
            .create_multiplier(name, value)
            .await
            .map_err(repository_error("create multiplier"))?;

        match created {
            Some(multiplier) => {
                log::info!("Multiplier {} created at {}", name.as_str(), value);
                Ok(multiplier)
            }
            None => Err(ServiceError::Conflict(format!(
                "Multiplier {} already exists",
                name.as_str()
            ))),
        }
    }

    async fn upsert(&self, name: BetType, value: Decimal) -> Result<Multiplier, ServiceError> {
        let multiplier = self
            .multipliers
            .upsert_multiplier(name, value)
            .await
            .map_err(repository_error("upsert multiplier"))?;

        log::info!("Multiplier {} set to {}", name.as_str(), value);
        Ok(multiplier)
    }

    async fn delete(&self, id: String) -> Result<String, ServiceError> {
        let deleted = self
            .multipliers
            .delete_multiplier(&id)
            .await
            .map_err(repository_error("delete multiplier"))?;

        if !deleted {
            return Err(ServiceError::NotFound("Multiplier not found".to_string()));
        }
        Ok(id)
    }
}

#[async_trait]
impl RequestHandler<MultiplierRequest> for MultiplierRequestHandler {
    async fn handle_request(&self, request: MultiplierRequest) {
        match request {
            MultiplierRequest::List { response } => {
                let multipliers = self
                    .multipliers
                    .list_multipliers()
                    .await
                    .map_err(repository_error("list multipliers"));
                let _ = response.send(multipliers);
            }
            MultiplierRequest::Create {
                name,
                value,
                response,
            } => {
                let result = self.create(name, value).await;
                let _ = response.send(result);
            }
            MultiplierRequest::Upsert {
                name,
                value,
                response,
            } => {
                let result = self.upsert(name, value).await;
                let _ = response.send(result);
            }
            MultiplierRequest::Delete { id, response } => {
                let result = self.delete(id).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct MultiplierService;

impl MultiplierService {
    pub fn new() -> Self {
        MultiplierService {}
    }
}

#[async_trait]
impl Service<MultiplierRequest, MultiplierRequestHandler> for MultiplierService {}
