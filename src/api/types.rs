//! Wire types for the broker REST API.
//!
//! Raw broker strings are mapped to closed enums here, at the boundary;
//! nothing downstream ever sees a status string.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Direction of an order leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

/// Closed order status set used by the executor state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
    Rejected,
    Expired,
}

impl OrderStatus {
    /// Map a broker status string into the closed set. Working states
    /// ("WORKING", "QUEUED", "ACCEPTED", "PENDING_ACTIVATION", ...) and
    /// anything unrecognized stay Pending; the chase loop's timeout
    /// handles orders stuck in an unknown state.
    pub fn from_broker(raw: &str) -> Self {
        match raw {
            "FILLED" => OrderStatus::Filled,
            "CANCELED" | "CANCELLED" => OrderStatus::Cancelled,
            "REJECTED" => OrderStatus::Rejected,
            "EXPIRED" => OrderStatus::Expired,
            _ => OrderStatus::Pending,
        }
    }

    /// Terminal without a fill: the chase loop re-prices and resubmits.
    pub fn is_dead(&self) -> bool {
        matches!(
            self,
            OrderStatus::Cancelled | OrderStatus::Rejected | OrderStatus::Expired
        )
    }
}

/// Account balance snapshot used by the sizer and risk gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balances {
    /// Total account equity (liquidation value)
    pub equity: Decimal,

    /// Cash available for new positions (settled for cash accounts)
    pub available_cash: Decimal,

    /// Margin account, subject to pattern-day-trader rules
    pub is_margin_account: bool,
}

// ---------------------------------------------------------------------------
// Raw response shapes (Schwab-style)
// ---------------------------------------------------------------------------

/// One symbol's entry in the quotes response map.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteEnvelope {
    pub quote: RawQuote,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuote {
    #[serde(default)]
    pub last_price: Decimal,
    #[serde(default)]
    pub bid_price: Decimal,
    #[serde(default)]
    pub ask_price: Decimal,
    #[serde(default)]
    pub total_volume: u64,
}

/// Quotes endpoint returns a map of symbol to envelope.
pub type QuotesResponse = HashMap<String, QuoteEnvelope>;

/// Option chain response: exp-date maps keyed by "YYYY-MM-DD:dte", then
/// strike string, then a list of contracts.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainResponse {
    #[serde(default)]
    pub call_exp_date_map: HashMap<String, HashMap<String, Vec<RawContract>>>,
    #[serde(default)]
    pub put_exp_date_map: HashMap<String, HashMap<String, Vec<RawContract>>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawContract {
    pub symbol: String,
    #[serde(default)]
    pub bid: Decimal,
    #[serde(default)]
    pub ask: Decimal,
    #[serde(default)]
    pub last: Decimal,
    #[serde(default)]
    pub delta: Decimal,
    #[serde(default)]
    pub total_volume: u64,
    #[serde(default)]
    pub open_interest: u64,
}

/// Order state as seen by the executor: the closed status plus the
/// broker-reported fill price when one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderView {
    pub status: OrderStatus,

    /// Broker-reported average fill price. None until filled, or when
    /// the broker omits it; callers fall back to the limit.
    pub fill_price: Option<Decimal>,
}

/// Order status endpoint response (fields we consume).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOrder {
    pub status: String,
    #[serde(default)]
    pub price: Decimal,
}

impl RawOrder {
    pub fn into_view(self) -> OrderView {
        let status = OrderStatus::from_broker(&self.status);
        let fill_price =
            (status == OrderStatus::Filled && self.price > Decimal::ZERO).then_some(self.price);
        OrderView { status, fill_price }
    }
}

/// Token refresh response from the OAuth endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
}

/// Accounts endpoint response (fields we consume).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccount {
    pub securities_account: RawSecuritiesAccount,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSecuritiesAccount {
    #[serde(rename = "type", default)]
    pub account_type: String,
    pub current_balances: RawBalances,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBalances {
    #[serde(default)]
    pub liquidation_value: Decimal,
    #[serde(default)]
    pub cash_available_for_trading: Decimal,
}

impl RawAccount {
    pub fn into_balances(self) -> Balances {
        Balances {
            equity: self.securities_account.current_balances.liquidation_value,
            available_cash: self
                .securities_account
                .current_balances
                .cash_available_for_trading,
            is_margin_account: self.securities_account.account_type == "MARGIN",
        }
    }
}
