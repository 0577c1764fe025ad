use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::{repository_error, Reply, RequestHandler, Service, ServiceError};
use crate::models::bets::{Bet, BetReceipt, BetSlip, NewBet};
use crate::models::{round_money, Page, MONEY_COLUMN_LIMIT};
use crate::repositories::bets::BetRepository;
use crate::repositories::multipliers::MultiplierRepository;
use crate::repositories::users::UserRepository;

pub enum BettingRequest {
    PlaceBet {
        slip: BetSlip,
        response: Reply<BetReceipt>,
    },
    GetHistory {
        email: String,
        page: Page,
        response: Reply<Vec<Bet>>,
    },
}

#[derive(Clone)]
pub struct BettingRequestHandler {
    users: Arc<dyn UserRepository>,
    bets: Arc<dyn BetRepository>,
    multipliers: Arc<dyn MultiplierRepository>,
    currency: String,
}

impl BettingRequestHandler {
    pub fn new(
        users: Arc<dyn UserRepository>,
        bets: Arc<dyn BetRepository>,
        multipliers: Arc<dyn MultiplierRepository>,
        currency: String,
    ) -> Self {
        BettingRequestHandler {
            users,
            bets,
            multipliers,
            currency,
        }
    }

    async fn place_bet(&self, slip: BetSlip) -> Result<BetReceipt, ServiceError> {
        self.users
            .get_user_by_email(&slip.email)
            .await
            .map_err(repository_error("get user"))?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        let multiplier = self
            .multipliers
            .get_multiplier(slip.bet_type)
            .await
            .map_err(repository_error("get multiplier"))?
            .ok_or_else(|| {
                log::error!("No multiplier configured for {}", slip.bet_type.as_str());
                ServiceError::Configuration(format!(
                    "Multiplier for {} is not configured",
                    slip.bet_type.as_str()
                ))
            })?;

        let prize = slip
            .amount
            .checked_mul(multiplier.value)
            .map(round_money)
            .filter(|prize| *prize < Decimal::from(MONEY_COLUMN_LIMIT))
            .ok_or_else(|| ServiceError::InvalidInput("Potential prize is too large".to_string()))?;
        let note = format!(
            "Bet {} on {}: {} (x{})",
            slip.bet_type.as_str(),
            slip.number,
            slip.amount,
            multiplier.value
        );

        let placed = self
            .bets
            .place_bet(NewBet {
                email: slip.email.clone(),
                bet_type: slip.bet_type,
                number: slip.number,
                amount: slip.amount,
                multiplier: multiplier.value,
                prize,
                currency: self.currency.clone(),
                note,
                request_id: slip.request_id,
            })
            .await
            .map_err(|e| {
                log::warn!("Bet from {} rejected: {}", slip.email, e);
                ServiceError::from(e)
            })?;

        if placed.replayed {
            log::info!("Bet {} replayed for {}", placed.bet.id, slip.email);
        } else {
            log::info!(
                "Bet {} placed by {}: {} on {}",
                placed.bet.id,
                slip.email,
                placed.bet.amount,
                placed.bet.number
            );
        }

        Ok(BetReceipt {
            bet_id: placed.bet.id,
            transaction_id: placed.transaction_id,
            new_balance: placed.new_balance,
            currency: self.currency.clone(),
            prize: placed.bet.prize,
            replayed: placed.replayed,
        })
    }

    async fn get_history(&self, email: &str, page: Page) -> Result<Vec<Bet>, ServiceError> {
        let user = self
            .users
            .get_user_by_email(email)
            .await
            .map_err(repository_error("get user"))?
            .ok_or_else(|| ServiceError::NotFound("User not found".to_string()))?;

        self.bets
            .list_bets(&user.id, page)
            .await
            .map_err(repository_error("list bets"))
    }
}

#[async_trait]
impl RequestHandler<BettingRequest> for BettingRequestHandler {
    async fn handle_request(&self, request: BettingRequest) {
        match request {
            BettingRequest::PlaceBet { slip, response } => {
                let receipt = self.place_bet(slip).await;
                let _ = response.send(receipt);
            }
            BettingRequest::GetHistory {
                email,
                page,
                response,
            } => {
                let bets = self.get_history(&email, page).await;
                let _ = response.send(bets);
            }
        }
    }
}

pub struct BettingService;

impl BettingService {
    pub fn new() -> Self {
        BettingService {}
    }
}

#[async_trait]
impl Service<BettingRequest, BettingRequestHandler> for BettingService {}
