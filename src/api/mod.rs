//! Broker API layer: trait seams plus the REST client implementing them.

pub mod broker_client;
pub mod types;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::errors::BrokerError;
use crate::models::{Instrument, Quote};

pub use broker_client::BrokerClient;
pub use types::{Balances, OrderSide, OrderStatus, OrderView};

/// Market-data side of the broker.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<Quote, BrokerError>;

    /// Batch quotes for a watchlist. Symbols the broker does not return
    /// are simply absent from the map.
    async fn quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>, BrokerError>;

    /// Near-expiry option chain for an underlying.
    async fn instrument_chain(&self, underlying: &str) -> Result<Vec<Instrument>, BrokerError>;

    /// Refresh a single instrument's quote by its broker symbol.
    async fn instrument_quote(&self, id: &str) -> Result<Instrument, BrokerError>;
}

/// Order placement and tracking.
#[async_trait]
pub trait OrderGateway: Send + Sync {
    /// Submit a day limit order, returning the broker order id.
    async fn place_limit(
        &self,
        instrument_id: &str,
        side: OrderSide,
        quantity: u32,
        limit_price: Decimal,
    ) -> Result<String, BrokerError>;

    /// Current status and, once filled, the broker-reported fill price.
    async fn order_status(&self, order_id: &str) -> Result<OrderView, BrokerError>;

    /// Cancel an order. Returns false when the broker reports it already
    /// terminal; cancellation is idempotent either way.
    async fn cancel(&self, order_id: &str) -> Result<bool, BrokerError>;
}

/// Account balances for sizing and risk checks.
#[async_trait]
pub trait AccountInfoProvider: Send + Sync {
    async fn balances(&self) -> Result<Balances, BrokerError>;
}
