use std::sync::Arc;

use async_trait::async_trait;

use super::{repository_error, Reply, RequestHandler, Service, ServiceError};
use crate::models::results::{
    GameResult, IncreaseGrowth, PublishResult, ResultBoard, RESULT_HISTORY_LIMIT,
};
use crate::repositories::results::ResultRepository;

pub enum ResultRequest {
    Show {
        response: Reply<ResultBoard>,
    },
    Publish {
        result: PublishResult,
        response: Reply<GameResult>,
    },
    LatestGrowth {
        response: Reply<Option<IncreaseGrowth>>,
    },
}

#[derive(Clone)]
pub struct ResultRequestHandler {
    results: Arc<dyn ResultRepository>,
}

impl ResultRequestHandler {
    pub fn new(results: Arc<dyn ResultRepository>) -> Self {
        ResultRequestHandler { results }
    }

    async fn show(&self) -> Result<ResultBoard, ServiceError> {
        let current = self
            .results
            .current_results()
            .await
            .map_err(repository_error("current results"))?;
        let history = self
            .results
            .result_history(RESULT_HISTORY_LIMIT)
            .await
            .map_err(repository_error("result history"))?;

        Ok(ResultBoard { current, history })
    }

    async fn publish(&self, result: &PublishResult) -> Result<GameResult, ServiceError> {
        let published = self
            .results
            .publish_result(result)
            .await
            .map_err(repository_error("publish result"))?;

        log::info!(
            "Result for {} set to {} ({})",
            published.game_name,
            published.number.as_deref().unwrap_or("-"),
            published.status.as_str()
        );
        Ok(published)
    }
}

#[async_trait]
impl RequestHandler<ResultRequest> for ResultRequestHandler {
    async fn handle_request(&self, request: ResultRequest) {
        match request {
            ResultRequest::Show { response } => {
                let board = self.show().await;
                let _ = response.send(board);
            }
            ResultRequest::Publish { result, response } => {
                let published = self.publish(&result).await;
                let _ = response.send(published);
            }
            ResultRequest::LatestGrowth { response } => {
                let growth = self
                    .results
                    .latest_growth()
                    .await
                    .map_err(repository_error("latest growth"));
                let _ = response.send(growth);
            }
        }
    }
}

pub struct ResultService;

impl ResultService {
    pub fn new() -> Self {
        ResultService {}
    }
}

#[async_trait]
impl Service<ResultRequest, ResultRequestHandler> for ResultService {}
