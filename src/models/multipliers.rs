use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::parse_decimal;

/// Upper bound (exclusive) of the `NUMERIC(12, 4)` multiplier column.
pub const MULTIPLIER_LIMIT: i64 = 100_000_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    Single,
    Double,
    Triple,
}

impl BetType {
    pub const ALL: [BetType; 3] = [BetType::Single, BetType::Double, BetType::Triple];

    pub fn as_str(&self) -> &'static str {
        match self {
            BetType::Single => "single",
            BetType::Double => "double",
            BetType::Triple => "triple",
        }
    }

    /// Number of digits a wager of this type must carry.
    pub fn digits(&self) -> usize {
        match self {
            BetType::Single => 1,
            BetType::Double => 2,
            BetType::Triple => 3,
        }
    }
}

impl FromStr for BetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(BetType::Single),
            "double" => Ok(BetType::Double),
            "triple" => Ok(BetType::Triple),
            _ => Err("betType must be one of single, double, triple".to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Multiplier {
    pub id: String,
    pub name: BetType,
    pub value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct MultiplierRequest {
    pub name: Option<String>,
    pub value: Option<serde_json::Value>,
}

impl MultiplierRequest {
    pub fn validate(self) -> Result<(BetType, Decimal), String> {
        let name = self
            .name
            .ok_or_else(|| "name is required".to_string())?
            .parse::<BetType>()
            .map_err(|_| "name must be one of single, double, triple".to_string())?;

        let value = self
            .value
            .as_ref()
            .and_then(parse_decimal)
            .map(|value| value.round_dp(4))
            .ok_or_else(|| "value must be a finite number".to_string())?;
        if value < Decimal::ZERO {
            return Err("value must be greater than or equal to 0".to_string());
        }
        if value >= Decimal::from(MULTIPLIER_LIMIT) {
            return Err(format!("value must be less than {}", MULTIPLIER_LIMIT));
        }

        Ok((name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(name: &str, value: serde_json::Value) -> MultiplierRequest {
        MultiplierRequest {
            name: Some(name.to_string()),
            value: Some(value),
        }
    }

    #[test]
    fn names_are_normalized() {
        let (name, value) = request(" TRIPLE ", json!(900)).validate().unwrap();
        assert_eq!(name, BetType::Triple);
        assert_eq!(value, Decimal::from(900));
    }

    #[test]
    fn fractional_values_keep_precision() {
        let (_, value) = request("single", json!("9.125")).validate().unwrap();
        assert_eq!(value, Decimal::new(9125, 3));
    }

    #[test]
    fn invalid_multipliers_are_rejected() {
        assert!(request("quad", json!(10)).validate().is_err());
        assert!(request("single", json!(-1)).validate().is_err());
        assert!(request("single", json!("ten")).validate().is_err());
        assert!(MultiplierRequest { name: Some("single".into()), value: None }.validate().is_err());
        assert!(request("single", json!(0)).validate().is_ok());
        assert!(request("single", json!(99_999_999)).validate().is_ok());
        assert!(request("single", json!(100_000_000)).validate().is_err());
    }
}
