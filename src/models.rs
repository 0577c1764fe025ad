use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;

pub mod bets;
pub mod multipliers;
pub mod notices;
pub mod results;
pub mod transactions;
pub mod users;
pub mod withdrawals;

pub const MAX_PAGE_SIZE: u32 = 200;
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest wager or withdraw accepted from a request.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000;
/// Upper bound (exclusive) of a `NUMERIC(20, 2)` money column.
pub const MONEY_COLUMN_LIMIT: i64 = 1_000_000_000_000_000_000;

/// Money is kept at two decimal places everywhere.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Accepts a JSON number or a numeric string and returns it as rounded money.
/// NaN, infinities and non-numeric input yield `None`.
pub fn parse_money(value: &serde_json::Value) -> Option<Decimal> {
    parse_decimal(value).map(round_money)
}

/// Same input rules as [`parse_money`], without rounding.
pub fn parse_decimal(value: &serde_json::Value) -> Option<Decimal> {
    let parsed = match value {
        serde_json::Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Decimal::from(int)
            } else {
                let float = number.as_f64()?;
                if !float.is_finite() {
                    return None;
                }
                Decimal::try_from(float).ok()?
            }
        }
        serde_json::Value::String(text) => {
            let text = text.trim();
            let float: f64 = text.parse().ok()?;
            if !float.is_finite() {
                return None;
            }
            text.parse::<Decimal>()
                .or_else(|_| Decimal::try_from(float))
                .ok()?
        }
        _ => return None,
    };

    Some(parsed)
}

/// Parses a required, positive request amount no larger than [`MAX_AMOUNT`].
pub fn parse_amount(value: Option<&serde_json::Value>) -> Result<Decimal, String> {
    let amount = value
        .and_then(parse_money)
        .ok_or_else(|| "amount must be a finite number".to_string())?;
    if amount <= Decimal::ZERO {
        return Err("amount must be greater than 0".to_string());
    }
    if amount > Decimal::from(MAX_AMOUNT) {
        return Err(format!("amount must be at most {}", MAX_AMOUNT));
    }

    Ok(amount)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, String> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);

        if page == 0 {
            return Err("page must be at least 1".to_string());
        }
        if limit == 0 {
            return Err("limit must be at least 1".to_string());
        }

        Ok(Self {
            page,
            limit: limit.min(MAX_PAGE_SIZE),
        })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PagedEmailRequest {
    pub email: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl EmailRequest {
    pub fn validate(self) -> Result<String, String> {
        required_email(self.email)
    }
}

impl PagedEmailRequest {
    pub fn validate(self) -> Result<(String, Page), String> {
        let email = required_email(self.email)?;
        let page = Page::new(self.page, self.limit)?;

        Ok((email, page))
    }
}

pub fn required_email(email: Option<String>) -> Result<String, String> {
    match email.map(|e| normalize_email(&e)) {
        Some(email) if !email.is_empty() => Ok(email),
        _ => Err("email is required".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn money_is_rounded_to_cents() {
        assert_eq!(parse_money(&json!(10)), Some(Decimal::from(10)));
        assert_eq!(parse_money(&json!("1.005")), Some(Decimal::new(101, 2)));
        assert_eq!(parse_money(&json!(2.5)), Some(Decimal::new(250, 2)));
        assert_eq!(parse_money(&json!("25.5")), Some(Decimal::new(2550, 2)));
    }

    #[test]
    fn non_numeric_money_is_rejected() {
        assert_eq!(parse_money(&json!("abc")), None);
        assert_eq!(parse_money(&json!("NaN")), None);
        assert_eq!(parse_money(&json!("inf")), None);
        assert_eq!(parse_money(&json!(null)), None);
        assert_eq!(parse_money(&json!(true)), None);
    }

    #[test]
    fn page_limits_are_capped() {
        let page = Page::new(Some(3), Some(500)).unwrap();
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 400);
        assert!(Page::new(Some(0), None).is_err());
        assert!(Page::new(None, Some(0)).is_err());
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(required_email(Some("  Bob@Example.COM ".into())).unwrap(), "bob@example.com");
        assert!(required_email(Some("   ".into())).is_err());
        assert!(required_email(None).is_err());
    }
}
