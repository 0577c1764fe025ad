use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{parse_amount, required_email};
use crate::models::multipliers::BetType;

pub const MAX_REQUEST_ID_LENGTH: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetStatus {
    Pending,
    Win,
    Loss,
}

impl BetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetStatus::Pending => "pending",
            BetStatus::Win => "win",
            BetStatus::Loss => "loss",
        }
    }
}

impl FromStr for BetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BetStatus::Pending),
            "win" => Ok(BetStatus::Win),
            "loss" => Ok(BetStatus::Loss),
            other => Err(format!("unknown bet status: {}", other)),
        }
    }
}

/// One wager row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bet {
    pub id: String,
    pub user_id: String,
    pub bet_type: BetType,
    pub number: String,
    pub amount: Decimal,
    pub multiplier: Decimal,
    pub prize: Decimal,
    pub status: BetStatus,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A validated wager, ready for the betting service.
#[derive(Clone, Debug, PartialEq)]
pub struct BetSlip {
    pub email: String,
    pub number: String,
    pub amount: Decimal,
    pub bet_type: BetType,
    pub request_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBetRequest {
    pub email: Option<String>,
    pub number: Option<serde_json::Value>,
    pub amount: Option<serde_json::Value>,
    pub bet_type: Option<String>,
    pub request_id: Option<String>,
}

impl PlaceBetRequest {
    pub fn validate(self) -> Result<BetSlip, String> {
        let email = required_email(self.email)?;

        let bet_type = self
            .bet_type
            .ok_or_else(|| "betType is required".to_string())?
            .parse::<BetType>()?;

        let number = match self.number {
            Some(number) => normalize_number(&number, bet_type)?,
            None => return Err("number is required".to_string()),
        };

        let amount = parse_amount(self.amount.as_ref())?;

        let request_id = match self.request_id.map(|id| id.trim().to_string()) {
            Some(id) if id.len() > MAX_REQUEST_ID_LENGTH => {
                return Err(format!(
                    "requestId must be at most {} characters",
                    MAX_REQUEST_ID_LENGTH
                ))
            }
            Some(id) if !id.is_empty() => Some(id),
            _ => None,
        };

        Ok(BetSlip {
            email,
            number,
            amount,
            bet_type,
            request_id,
        })
    }
}

/// Checks the chosen number against the bet type and returns its digit string.
pub fn normalize_number(value: &serde_json::Value, bet_type: BetType) -> Result<String, String> {
    let digits = match value {
        serde_json::Value::String(text) => text.trim().to_string(),
        serde_json::Value::Number(number) => match number.as_u64() {
            Some(n) => n.to_string(),
            None => return Err("number must be a non-negative whole number".to_string()),
        },
        _ => return Err("number must be a number".to_string()),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err("number must contain digits only".to_string());
    }
    if digits.len() != bet_type.digits() {
        return Err(format!(
            "{} bets require a {}-digit number",
            bet_type.as_str(),
            bet_type.digits()
        ));
    }

    Ok(digits)
}

/// Everything the ledger needs to persist a wager atomically.
#[derive(Clone, Debug)]
pub struct NewBet {
    pub email: String,
    pub bet_type: BetType,
    pub number: String,
    pub amount: Decimal,
    pub multiplier: Decimal,
    pub prize: Decimal,
    pub currency: String,
    pub note: String,
    pub request_id: Option<String>,
}

#[derive(Clone, Debug)]
pub struct PlacedBet {
    pub bet: Bet,
    pub transaction_id: String,
    pub new_balance: Decimal,
    /// True when an earlier request with the same request id was returned.
    pub replayed: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetReceipt {
    pub bet_id: String,
    pub transaction_id: String,
    pub new_balance: Decimal,
    pub currency: String,
    pub prize: Decimal,
    pub replayed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(number: serde_json::Value, bet_type: BetType) -> Result<String, String> {
        normalize_number(&number, bet_type)
    }

    #[test]
    fn digit_boundaries_per_bet_type() {
        assert_eq!(check(json!("0"), BetType::Single).unwrap(), "0");
        assert_eq!(check(json!("9"), BetType::Single).unwrap(), "9");
        assert_eq!(check(json!(9), BetType::Single).unwrap(), "9");
        assert_eq!(check(json!("00"), BetType::Double).unwrap(), "00");
        assert_eq!(check(json!("99"), BetType::Double).unwrap(), "99");
        assert_eq!(check(json!("000"), BetType::Triple).unwrap(), "000");
        assert_eq!(check(json!("999"), BetType::Triple).unwrap(), "999");
    }

    #[test]
    fn digit_count_must_match() {
        assert!(check(json!("10"), BetType::Single).is_err());
        assert!(check(json!("5"), BetType::Double).is_err());
        assert!(check(json!("100"), BetType::Double).is_err());
        assert!(check(json!("99"), BetType::Triple).is_err());
        assert!(check(json!("1000"), BetType::Triple).is_err());
    }

    #[test]
    fn non_digits_are_rejected() {
        assert!(check(json!("1a"), BetType::Double).is_err());
        assert!(check(json!("-1"), BetType::Double).is_err());
        assert!(check(json!(-1), BetType::Single).is_err());
        assert!(check(json!(1.5), BetType::Single).is_err());
        assert!(check(json!(""), BetType::Single).is_err());
        assert!(check(json!(null), BetType::Single).is_err());
    }

    #[test]
    fn place_bet_request_validation() {
        let request = |amount: serde_json::Value, bet_type: &str| PlaceBetRequest {
            email: Some("Player@Example.com".into()),
            number: Some(json!("42")),
            amount: Some(amount),
            bet_type: Some(bet_type.into()),
            request_id: Some("  req-1 ".into()),
        };

        let slip = request(json!(10), "double").validate().unwrap();
        assert_eq!(slip.email, "player@example.com");
        assert_eq!(slip.number, "42");
        assert_eq!(slip.request_id.as_deref(), Some("req-1"));

        assert!(request(json!(0), "double").validate().is_err());
        assert!(request(json!(-5), "double").validate().is_err());
        assert!(request(json!("lots"), "double").validate().is_err());
        assert!(request(json!(10), "quad").validate().is_err());
        assert!(request(json!(10), "single").validate().is_err());
        assert!(request(json!(1_000_000_000_000i64), "double").validate().is_ok());
        assert!(request(json!("1000000000000.01"), "double").validate().is_err());
        assert!(request(json!("10000000000000000000000000000"), "double")
            .validate()
            .is_err());
    }

    #[test]
    fn oversized_request_ids_are_rejected() {
        let request = PlaceBetRequest {
            email: Some("player@example.com".into()),
            number: Some(json!("4")),
            amount: Some(json!(1)),
            bet_type: Some("single".into()),
            request_id: Some("x".repeat(MAX_REQUEST_ID_LENGTH + 1)),
        };

        assert!(request.validate().is_err());
    }
}
