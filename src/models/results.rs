use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const RESULT_HISTORY_LIMIT: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultStatus {
    Hold,
    Draw,
}

impl ResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultStatus::Hold => "hold",
            ResultStatus::Draw => "draw",
        }
    }
}

impl FromStr for ResultStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hold" => Ok(ResultStatus::Hold),
            "draw" => Ok(ResultStatus::Draw),
            _ => Err("status must be hold or draw".to_string()),
        }
    }
}

/// Live result pointer for one game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    pub id: String,
    pub game_name: String,
    pub number: Option<String>,
    pub display_time: String,
    pub status: ResultStatus,
    pub updated_at: DateTime<Utc>,
}

/// Historical draw feed entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEntry {
    pub id: String,
    pub game_name: String,
    pub number: Option<String>,
    pub display_time: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResultBoard {
    pub current: Vec<GameResult>,
    pub history: Vec<ResultEntry>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PublishResult {
    pub game_name: String,
    pub number: Option<String>,
    pub display_time: String,
    pub status: ResultStatus,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResultRequest {
    pub game_name: Option<String>,
    pub number: Option<String>,
    pub display_time: Option<String>,
    pub status: Option<String>,
}

impl PublishResultRequest {
    pub fn validate(self) -> Result<PublishResult, String> {
        let game_name = self
            .game_name
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty())
            .ok_or_else(|| "gameName is required".to_string())?;
        let display_time = self
            .display_time
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| "displayTime is required".to_string())?;
        let status = self.status.unwrap_or_default().parse::<ResultStatus>()?;

        let number = self
            .number
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if let Some(number) = &number {
            if !number.chars().all(|c| c.is_ascii_digit()) {
                return Err("number must contain digits only".to_string());
            }
        }
        if status == ResultStatus::Draw && number.is_none() {
            return Err("a drawn result needs a number".to_string());
        }

        Ok(PublishResult {
            game_name,
            number,
            display_time,
            status,
        })
    }
}

/// Interest/growth rate snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncreaseGrowth {
    pub id: String,
    pub rate: Decimal,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(status: &str, number: Option<&str>) -> PublishResultRequest {
        PublishResultRequest {
            game_name: Some(" Dhaka ".into()),
            number: number.map(str::to_string),
            display_time: Some("21:00".into()),
            status: Some(status.into()),
        }
    }

    #[test]
    fn held_results_need_no_number() {
        let result = request("hold", None).validate().unwrap();
        assert_eq!(result.game_name, "dhaka");
        assert_eq!(result.number, None);
    }

    #[test]
    fn drawn_results_need_a_digit_number() {
        assert!(request("draw", None).validate().is_err());
        assert!(request("draw", Some("4x")).validate().is_err());
        assert_eq!(request("draw", Some("472")).validate().unwrap().status, ResultStatus::Draw);
    }
}
