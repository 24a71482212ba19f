//! Limit-order execution with a chase-and-retry loop.
//!
//! Orders start aggressive (at the touch plus an offset), get polled until
//! a timeout, then are cancelled and re-priced one increment closer to
//! urgency against a refreshed quote. Entries that exhaust their attempts
//! are abandoned; exits fall back to a single emergency order that crosses
//! the spread.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::config::ExecutorConfig;
use crate::api::types::{OrderSide, OrderStatus, OrderView};
use crate::api::{OrderGateway, QuoteSource};
use crate::errors::BrokerError;

/// Minimum price a limit order may carry.
const PRICE_FLOOR: Decimal = Decimal::from_parts(1, 0, 0, false, 2); // 0.01

/// A completed fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fill {
    /// Broker-reported fill price, or the submitted limit when the
    /// broker omits one
    pub price: Decimal,
    pub quantity: u32,
    /// Submissions it took (1 = filled on the first order)
    pub attempts: u32,
}

/// How an exit attempt concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Filled(Fill),
    /// Chase exhausted; one crossing order was submitted fire-and-forget
    EmergencySubmitted { order_id: String },
}

pub struct OrderExecutor<'a> {
    gateway: &'a dyn OrderGateway,
    quotes: &'a dyn QuoteSource,
    config: ExecutorConfig,
}

impl<'a> OrderExecutor<'a> {
    pub fn new(
        gateway: &'a dyn OrderGateway,
        quotes: &'a dyn QuoteSource,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            gateway,
            quotes,
            config,
        }
    }

    /// Buy into a position. Returns None when the chase exhausts its
    /// attempts; abandoning an entry has no side effects.
    pub async fn execute_entry(
        &self,
        instrument_id: &str,
        quantity: u32,
    ) -> Result<Option<Fill>, BrokerError> {
        let fill = self.chase(instrument_id, OrderSide::Buy, quantity).await?;
        if fill.is_none() {
            info!(instrument_id, "entry abandoned after max attempts");
        }
        Ok(fill)
    }

    /// Close (part of) a position. An exhausted chase escalates to exactly
    /// one emergency order crossing the spread.
    pub async fn execute_exit(
        &self,
        instrument_id: &str,
        quantity: u32,
    ) -> Result<ExitOutcome, BrokerError> {
        if let Some(fill) = self.chase(instrument_id, OrderSide::Sell, quantity).await? {
            return Ok(ExitOutcome::Filled(fill));
        }

        let refreshed = self.quotes.instrument_quote(instrument_id).await?;
        let price = (refreshed.bid - self.config.emergency_offset).max(PRICE_FLOOR);
        let order_id = self
            .gateway
            .place_limit(instrument_id, OrderSide::Sell, quantity, price)
            .await?;
        warn!(instrument_id, order_id, %price, "emergency exit order submitted");
        Ok(ExitOutcome::EmergencySubmitted { order_id })
    }

    async fn chase(
        &self,
        instrument_id: &str,
        side: OrderSide,
        quantity: u32,
    ) -> Result<Option<Fill>, BrokerError> {
        let quote = self.quotes.instrument_quote(instrument_id).await?;
        let mut limit = self.aggressive_limit(side, quote.bid, quote.ask);
        let mut attempts = 0u32;

        while attempts < self.config.max_attempts {
            attempts += 1;

            let order_id = match self
                .gateway
                .place_limit(instrument_id, side, quantity, limit)
                .await
            {
                Ok(id) => id,
                Err(BrokerError::OrderRejected(msg)) => {
                    // A rejection burns the attempt like any dead order.
                    debug!(instrument_id, attempts, %msg, "order rejected");
                    limit = self.reprice(instrument_id, side, limit).await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if let Some(view) = self.poll_until_filled(&order_id).await? {
                let price = view.fill_price.unwrap_or(limit);
                debug!(instrument_id, order_id, attempts, %price, "order filled");
                return Ok(Some(Fill {
                    price,
                    quantity,
                    attempts,
                }));
            }

            // Cancellation is idempotent; a false return means the order
            // was already terminal.
            self.gateway.cancel(&order_id).await?;

            if attempts < self.config.max_attempts {
                limit = self.reprice(instrument_id, side, limit).await?;
            }
        }

        Ok(None)
    }

    /// Poll the order until it fills, dies, or the per-attempt timeout
    /// lapses. Some only on a fill.
    async fn poll_until_filled(&self, order_id: &str) -> Result<Option<OrderView>, BrokerError> {
        let deadline = Instant::now() + Duration::from_secs(self.config.order_timeout_secs);
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            sleep(interval).await;
            let view = self.gateway.order_status(order_id).await?;
            match view.status {
                OrderStatus::Filled => return Ok(Some(view)),
                status if status.is_dead() => return Ok(None),
                _ if Instant::now() >= deadline => return Ok(None),
                _ => {}
            }
        }
    }

    /// One increment toward urgency, clamped at a refreshed touch so a
    /// moving market never leaves the order priced through itself.
    async fn reprice(
        &self,
        instrument_id: &str,
        side: OrderSide,
        current: Decimal,
    ) -> Result<Decimal, BrokerError> {
        let refreshed = self.quotes.instrument_quote(instrument_id).await?;
        let limit = match side {
            OrderSide::Buy => (current + self.config.chase_increment)
                .min(refreshed.ask + self.config.limit_offset),
            OrderSide::Sell => (current - self.config.chase_increment)
                .max(refreshed.bid - self.config.limit_offset),
        };
        Ok(limit.max(PRICE_FLOOR).round_dp(2))
    }

    fn aggressive_limit(&self, side: OrderSide, bid: Decimal, ask: Decimal) -> Decimal {
        let limit = match side {
            OrderSide::Buy => ask + self.config.limit_offset,
            OrderSide::Sell => bid - self.config.limit_offset,
        };
        limit.max(PRICE_FLOOR).round_dp(2)
    }
}
