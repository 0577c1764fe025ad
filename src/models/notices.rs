use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_NOTICE_LENGTH: usize = 1000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NoticeRequest {
    pub message: Option<String>,
}

impl NoticeRequest {
    pub fn validate(self) -> Result<String, String> {
        let message = self.message.map(|m| m.trim().to_string()).unwrap_or_default();

        if message.is_empty() {
            return Err("message is required".to_string());
        }
        if message.chars().count() > MAX_NOTICE_LENGTH {
            return Err(format!(
                "message must be at most {} characters",
                MAX_NOTICE_LENGTH
            ));
        }

        Ok(message)
    }
}
