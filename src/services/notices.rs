use std::sync::Arc;

use async_trait::async_trait;

use super::{repository_error, Reply, RequestHandler, Service, ServiceError};
use crate::models::notices::Notice;
use crate::repositories::notices::NoticeRepository;

pub enum NoticeRequest {
    List {
        response: Reply<Vec<Notice>>,
    },
    Create {
        message: String,
        response: Reply<Notice>,
    },
    Delete {
        id: String,
        response: Reply<String>,
    },
}

#[derive(Clone)]
pub struct NoticeRequestHandler {
    notices: Arc<dyn NoticeRepository>,
}

impl NoticeRequestHandler {
    pub fn new(notices: Arc<dyn NoticeRepository>) -> Self {
        NoticeRequestHandler { notices }
    }

    async fn delete(&self, id: String) -> Result<String, ServiceError> {
        let deleted = self
            .notices
            .delete_notice(&id)
            .await
            .map_err(repository_error("delete notice"))?;

        if !deleted {
            return Err(ServiceError::NotFound("Notice not found".to_string()));
        }
        Ok(id)
    }
}

#[async_trait]
impl RequestHandler<NoticeRequest> for NoticeRequestHandler {
    async fn handle_request(&self, request: NoticeRequest) {
        match request {
            NoticeRequest::List { response } => {
                let notices = self
                    .notices
                    .list_notices()
                    .await
                    .map_err(repository_error("list notices"));
                let _ = response.send(notices);
            }
            NoticeRequest::Create { message, response } => {
                let notice = self
                    .notices
                    .create_notice(&message)
                    .await
                    .map_err(repository_error("create notice"));
                let _ = response.send(notice);
            }
            NoticeRequest::Delete { id, response } => {
                let result = self.delete(id).await;
                let _ = response.send(result);
            }
        }
    }
}

pub struct NoticeService;

impl NoticeService {
    pub fn new() -> Self {
        NoticeService {}
    }
}

#[async_trait]
impl Service<NoticeRequest, NoticeRequestHandler> for NoticeService {}
