use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{parse_amount, required_email};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawMethod {
    Bkash,
    Nagad,
    Rocket,
    Bank,
}

impl WithdrawMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawMethod::Bkash => "bkash",
            WithdrawMethod::Nagad => "nagad",
            WithdrawMethod::Rocket => "rocket",
            WithdrawMethod::Bank => "bank",
        }
    }
}

impl FromStr for WithdrawMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bkash" => Ok(WithdrawMethod::Bkash),
            "nagad" => Ok(WithdrawMethod::Nagad),
            "rocket" => Ok(WithdrawMethod::Rocket),
            "bank" => Ok(WithdrawMethod::Bank),
            _ => Err("method must be one of bkash, nagad, rocket, bank".to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawStatus {
    Pending,
    Approved,
    Rejected,
}

impl WithdrawStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawStatus::Pending => "pending",
            WithdrawStatus::Approved => "approved",
            WithdrawStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for WithdrawStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(WithdrawStatus::Pending),
            "approved" => Ok(WithdrawStatus::Approved),
            "rejected" => Ok(WithdrawStatus::Rejected),
            _ => Err("status must be one of pending, approved, rejected".to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdraw {
    pub id: String,
    pub user_email: String,
    pub agent_email: String,
    pub method: WithdrawMethod,
    pub payment_number: String,
    pub amount: Decimal,
    pub status: WithdrawStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewWithdraw {
    pub user_email: String,
    pub agent_email: String,
    pub method: WithdrawMethod,
    pub payment_number: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawCreateRequest {
    pub email: Option<String>,
    pub agent_email: Option<String>,
    pub method: Option<String>,
    pub payment_number: Option<String>,
    pub amount: Option<serde_json::Value>,
}

impl WithdrawCreateRequest {
    pub fn validate(self) -> Result<NewWithdraw, String> {
        let user_email = required_email(self.email)?;
        let agent_email = required_email(self.agent_email)
            .map_err(|_| "agentEmail is required".to_string())?;
        let method = self.method.unwrap_or_default().parse::<WithdrawMethod>()?;

        let payment_number = self
            .payment_number
            .map(|p| p.trim().to_string())
            .unwrap_or_default();
        if payment_number.is_empty() {
            return Err("paymentNumber is required".to_string());
        }

        let amount = parse_amount(self.amount.as_ref())?;

        Ok(NewWithdraw {
            user_email,
            agent_email,
            method,
            payment_number,
            amount,
        })
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WithdrawStatusRequest {
    pub id: Option<String>,
    pub status: Option<String>,
}

impl WithdrawStatusRequest {
    pub fn validate(self) -> Result<(String, WithdrawStatus), String> {
        let id = self
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| "id is required".to_string())?;

        match self.status.unwrap_or_default().parse::<WithdrawStatus>()? {
            WithdrawStatus::Pending => Err("status must be approved or rejected".to_string()),
            status => Ok((id, status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_validation() {
        let request = |method: &str, amount: serde_json::Value| WithdrawCreateRequest {
            email: Some("User@Example.com".into()),
            agent_email: Some("agent@example.com".into()),
            method: Some(method.into()),
            payment_number: Some("01700000000".into()),
            amount: Some(amount),
        };

        let withdraw = request("bKash", json!(250)).validate().unwrap();
        assert_eq!(withdraw.user_email, "user@example.com");
        assert_eq!(withdraw.method, WithdrawMethod::Bkash);

        assert!(request("paypal", json!(250)).validate().is_err());
        assert!(request("nagad", json!(0)).validate().is_err());
        assert!(request("nagad", json!("1e30")).validate().is_err());
    }

    #[test]
    fn status_request_cannot_reset_to_pending() {
        let request = |status: &str| WithdrawStatusRequest {
            id: Some("w-1".into()),
            status: Some(status.into()),
        };

        assert_eq!(request("approved").validate().unwrap().1, WithdrawStatus::Approved);
        assert!(request("pending").validate().is_err());
        assert!(request("done").validate().is_err());
    }
}
