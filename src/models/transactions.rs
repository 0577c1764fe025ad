use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Economic event kinds recorded in the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Deposit,
    WithdrawRequest,
    WithdrawRefund,
    BetPlace,
    BetWin,
    BetRefund,
    SignupBonus,
    ReferralBonus,
    BankTransfer,
    Interest,
    Adjustment,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::WithdrawRequest => "withdraw_request",
            TransactionType::WithdrawRefund => "withdraw_refund",
            TransactionType::BetPlace => "bet_place",
            TransactionType::BetWin => "bet_win",
            TransactionType::BetRefund => "bet_refund",
            TransactionType::SignupBonus => "signup_bonus",
            TransactionType::ReferralBonus => "referral_bonus",
            TransactionType::BankTransfer => "bank_transfer",
            TransactionType::Interest => "interest",
            TransactionType::Adjustment => "adjustment",
        }
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "deposit" => TransactionType::Deposit,
            "withdraw_request" => TransactionType::WithdrawRequest,
            "withdraw_refund" => TransactionType::WithdrawRefund,
            "bet_place" => TransactionType::BetPlace,
            "bet_win" => TransactionType::BetWin,
            "bet_refund" => TransactionType::BetRefund,
            "signup_bonus" => TransactionType::SignupBonus,
            "referral_bonus" => TransactionType::ReferralBonus,
            "bank_transfer" => TransactionType::BankTransfer,
            "interest" => TransactionType::Interest,
            "adjustment" => TransactionType::Adjustment,
            other => return Err(format!("unknown transaction type: {}", other)),
        };

        Ok(kind)
    }
}

/// Append-only ledger row. Negative amounts are debits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: Decimal,
    pub currency: String,
    pub reference_id: Option<String>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        user_id: &str,
        kind: TransactionType,
        amount: Decimal,
        currency: &str,
        reference_id: Option<String>,
        note: String,
    ) -> Self {
        Transaction {
            id: uuid::Uuid::new_v4().hyphenated().to_string(),
            user_id: user_id.to_string(),
            kind,
            amount,
            currency: currency.to_string(),
            reference_id,
            note,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_through_their_names() {
        for kind in [
            TransactionType::Deposit,
            TransactionType::WithdrawRequest,
            TransactionType::WithdrawRefund,
            TransactionType::BetPlace,
            TransactionType::SignupBonus,
            TransactionType::Adjustment,
        ] {
            assert_eq!(kind.as_str().parse::<TransactionType>().unwrap(), kind);
        }
    }

    #[test]
    fn kind_serializes_as_type() {
        let transaction = Transaction::new(
            "user-1",
            TransactionType::BetPlace,
            Decimal::from(-10),
            "BDT",
            Some("bet-1".into()),
            "Bet single on 7".into(),
        );
        let json = serde_json::to_value(&transaction).unwrap();

        assert_eq!(json["type"], "bet_place");
        assert_eq!(json["referenceId"], "bet-1");
        assert_eq!(json["amount"], -10.0);
    }
}
