//! REST client for a Schwab-style brokerage API.
//!
//! Handles the OAuth refresh-token flow, quote/chain fetching, limit-order
//! placement and tracking, and account balances. Implements the
//! `QuoteSource`, `OrderGateway`, and `AccountInfoProvider` seams so the
//! engine and tests never depend on this client directly.

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::types::{
    Balances, ChainResponse, OrderSide, OrderView, QuotesResponse, RawAccount, RawContract,
    RawOrder, TokenResponse,
};
use super::{AccountInfoProvider, OrderGateway, QuoteSource};
use crate::errors::BrokerError;
use crate::models::{Instrument, InstrumentKind, Quote};

/// Broker API base URLs
pub const TRADER_URL: &str = "https://api.schwabapi.com/trader/v1";
pub const MARKET_DATA_URL: &str = "https://api.schwabapi.com/marketdata/v1";
pub const TOKEN_URL: &str = "https://api.schwabapi.com/v1/oauth/token";

/// Authenticated broker client.
pub struct BrokerClient {
    http: Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    account_hash: String,
    access_token: RwLock<String>,
}

impl BrokerClient {
    pub fn new(
        client_id: &str,
        client_secret: &str,
        refresh_token: &str,
        account_hash: &str,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            refresh_token: refresh_token.to_string(),
            account_hash: account_hash.to_string(),
            access_token: RwLock::new(String::new()),
        })
    }

    /// Create from environment variables:
    /// - SCHWAB_CLIENT_ID
    /// - SCHWAB_CLIENT_SECRET
    /// - SCHWAB_REFRESH_TOKEN
    /// - SCHWAB_ACCOUNT_HASH
    pub fn from_env() -> anyhow::Result<Self> {
        use anyhow::Context;

        let client_id =
            std::env::var("SCHWAB_CLIENT_ID").context("SCHWAB_CLIENT_ID not set")?;
        let client_secret =
            std::env::var("SCHWAB_CLIENT_SECRET").context("SCHWAB_CLIENT_SECRET not set")?;
        let refresh_token =
            std::env::var("SCHWAB_REFRESH_TOKEN").context("SCHWAB_REFRESH_TOKEN not set")?;
        let account_hash =
            std::env::var("SCHWAB_ACCOUNT_HASH").context("SCHWAB_ACCOUNT_HASH not set")?;

        Self::new(&client_id, &client_secret, &refresh_token, &account_hash)
    }

    /// Exchange the refresh token for an access token, retrying transient
    /// network failures with exponential backoff. A 4xx from the token
    /// endpoint is a dead credential and fails immediately.
    pub async fn authenticate(&self) -> Result<(), BrokerError> {
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(60)),
            ..Default::default()
        };

        let token = backoff::future::retry(backoff, || async {
            let resp = self
                .http
                .post(TOKEN_URL)
                .basic_auth(&self.client_id, Some(&self.client_secret))
                .form(&[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", self.refresh_token.as_str()),
                ])
                .send()
                .await
                .map_err(|e| backoff::Error::transient(BrokerError::Transient(e)))?;

            let status = resp.status();
            if status.is_client_error() {
                let body = resp.text().await.unwrap_or_default();
                return Err(backoff::Error::permanent(BrokerError::Auth(format!(
                    "token refresh rejected ({status}): {body}"
                ))));
            }
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                warn!(%status, "token endpoint error, will retry");
                return Err(backoff::Error::transient(BrokerError::Api {
                    status: status.as_u16(),
                    body,
                }));
            }

            let token: TokenResponse = resp
                .json()
                .await
                .map_err(|e| backoff::Error::transient(BrokerError::Transient(e)))?;
            Ok(token)
        })
        .await?;

        debug!(expires_in = token.expires_in, "access token refreshed");
        *self.access_token.write().await = token.access_token;
        Ok(())
    }

    async fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token.read().await)
    }

    /// Check the HTTP status, surfacing the response body on failure.
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, BrokerError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BrokerError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn fetch_quotes(&self, symbols: &str) -> Result<QuotesResponse, BrokerError> {
        let url = format!("{MARKET_DATA_URL}/quotes");
        let resp = self
            .http
            .get(&url)
            .header("Authorization", self.bearer().await)
            .query(&[("symbols", symbols), ("fields", "quote")])
            .send()
            .await?;

        Ok(Self::check(resp).await?.json().await?)
    }

    fn contract_to_instrument(
        underlying: &str,
        kind: InstrumentKind,
        raw: RawContract,
    ) -> Instrument {
        Instrument {
            id: raw.symbol,
            underlying: underlying.to_string(),
            kind,
            bid: raw.bid,
            ask: raw.ask,
            last: raw.last,
            metric: raw.delta,
            volume: raw.total_volume,
            open_interest: raw.open_interest,
            multiplier: dec!(100),
        }
    }

    /// Option symbols carry the OCC expiry/strike tail; plain tickers don't.
    fn is_option_symbol(id: &str) -> bool {
        id.len() >= 15
    }

    fn instruction_for(id: &str, side: OrderSide) -> &'static str {
        match (Self::is_option_symbol(id), side) {
            (true, OrderSide::Buy) => "BUY_TO_OPEN",
            (true, OrderSide::Sell) => "SELL_TO_CLOSE",
            (false, OrderSide::Buy) => "BUY",
            (false, OrderSide::Sell) => "SELL",
        }
    }
}

#[async_trait]
impl QuoteSource for BrokerClient {
    async fn quote(&self, symbol: &str) -> Result<Quote, BrokerError> {
        let mut quotes = self.fetch_quotes(symbol).await?;
        let envelope = quotes
            .remove(symbol)
            .ok_or_else(|| BrokerError::QuoteUnavailable(symbol.to_string()))?;

        Ok(Quote {
            symbol: symbol.to_string(),
            timestamp: Utc::now(),
            last: envelope.quote.last_price,
            bid: envelope.quote.bid_price,
            ask: envelope.quote.ask_price,
            volume: envelope.quote.total_volume,
        })
    }

    async fn quotes(&self, symbols: &[String]) -> Result<HashMap<String, Quote>, BrokerError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let joined = symbols.join(",");
        let raw = self.fetch_quotes(&joined).await?;
        let now = Utc::now();

        Ok(raw
            .into_iter()
            .map(|(symbol, envelope)| {
                let quote = Quote {
                    symbol: symbol.clone(),
                    timestamp: now,
                    last: envelope.quote.last_price,
                    bid: envelope.quote.bid_price,
                    ask: envelope.quote.ask_price,
                    volume: envelope.quote.total_volume,
                };
                (symbol, quote)
            })
            .collect())
    }

    async fn instrument_chain(&self, underlying: &str) -> Result<Vec<Instrument>, BrokerError> {
        let today = Utc::now().date_naive().to_string();
        let url = format!("{MARKET_DATA_URL}/chains");
        let resp = self
            .http
            .get(&url)
            .header("Authorization", self.bearer().await)
            .query(&[
                ("symbol", underlying),
                ("contractType", "ALL"),
                ("strikeCount", "20"),
                ("fromDate", &today),
                ("toDate", &today),
            ])
            .send()
            .await?;

        let chain: ChainResponse = Self::check(resp).await?.json().await?;

        let mut instruments = Vec::new();
        for strikes in chain.call_exp_date_map.into_values() {
            for contracts in strikes.into_values() {
                for raw in contracts {
                    instruments.push(Self::contract_to_instrument(
                        underlying,
                        InstrumentKind::Call,
                        raw,
                    ));
                }
            }
        }
        for strikes in chain.put_exp_date_map.into_values() {
            for contracts in strikes.into_values() {
                for raw in contracts {
                    instruments.push(Self::contract_to_instrument(
                        underlying,
                        InstrumentKind::Put,
                        raw,
                    ));
                }
            }
        }

        debug!(underlying, count = instruments.len(), "fetched option chain");
        Ok(instruments)
    }

    async fn instrument_quote(&self, id: &str) -> Result<Instrument, BrokerError> {
        // Quote refresh only carries prices; delta/OI are not re-derived.
        let mut quotes = self.fetch_quotes(id).await?;
        let envelope = quotes
            .remove(id)
            .ok_or_else(|| BrokerError::QuoteUnavailable(id.to_string()))?;

        let (kind, multiplier) = if Self::is_option_symbol(id) {
            // OCC tail: C or P ahead of the 8-digit strike
            let kind = match id.as_bytes().get(id.len().saturating_sub(9)) {
                Some(b'P') => InstrumentKind::Put,
                _ => InstrumentKind::Call,
            };
            (kind, dec!(100))
        } else {
            (InstrumentKind::Share, Decimal::ONE)
        };

        Ok(Instrument {
            id: id.to_string(),
            underlying: id.split_whitespace().next().unwrap_or(id).to_string(),
            kind,
            bid: envelope.quote.bid_price,
            ask: envelope.quote.ask_price,
            last: envelope.quote.last_price,
            metric: Decimal::ZERO,
            volume: envelope.quote.total_volume,
            open_interest: 0,
            multiplier,
        })
    }
}

#[async_trait]
impl OrderGateway for BrokerClient {
    async fn place_limit(
        &self,
        instrument_id: &str,
        side: OrderSide,
        quantity: u32,
        limit_price: Decimal,
    ) -> Result<String, BrokerError> {
        let asset_type = if Self::is_option_symbol(instrument_id) {
            "OPTION"
        } else {
            "EQUITY"
        };

        let body = json!({
            "orderType": "LIMIT",
            "session": "NORMAL",
            "duration": "DAY",
            "orderStrategyType": "SINGLE",
            "price": limit_price.to_string(),
            "orderLegCollection": [{
                "instruction": Self::instruction_for(instrument_id, side),
                "quantity": quantity,
                "instrument": {
                    "symbol": instrument_id,
                    "assetType": asset_type
                }
            }]
        });

        let url = format!("{TRADER_URL}/accounts/{}/orders", self.account_hash);
        let resp = self
            .http
            .post(&url)
            .header("Authorization", self.bearer().await)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 400 || status.as_u16() == 422 {
            let body = resp.text().await.unwrap_or_default();
            return Err(BrokerError::OrderRejected(body));
        }
        let resp = Self::check(resp).await?;

        // Order id comes back as the tail of the Location header
        let order_id = resp
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .and_then(|loc| loc.rsplit('/').next())
            .map(str::to_string)
            .ok_or_else(|| {
                BrokerError::OrderRejected("no order id in placement response".to_string())
            })?;

        debug!(order_id, instrument_id, ?side, quantity, %limit_price, "limit order placed");
        Ok(order_id)
    }

    async fn order_status(&self, order_id: &str) -> Result<OrderView, BrokerError> {
        let url = format!(
            "{TRADER_URL}/accounts/{}/orders/{order_id}",
            self.account_hash
        );
        let resp = self
            .http
            .get(&url)
            .header("Authorization", self.bearer().await)
            .send()
            .await?;

        let raw: RawOrder = Self::check(resp).await?.json().await?;
        Ok(raw.into_view())
    }

    async fn cancel(&self, order_id: &str) -> Result<bool, BrokerError> {
        let url = format!(
            "{TRADER_URL}/accounts/{}/orders/{order_id}",
            self.account_hash
        );
        let resp = self
            .http
            .delete(&url)
            .header("Authorization", self.bearer().await)
            .send()
            .await?;

        // Already filled/cancelled orders come back 4xx; treat as "nothing
        // left to cancel" rather than an error.
        Ok(resp.status().is_success())
    }
}

#[async_trait]
impl AccountInfoProvider for BrokerClient {
    async fn balances(&self) -> Result<Balances, BrokerError> {
        let url = format!("{TRADER_URL}/accounts/{}", self.account_hash);
        let resp = self
            .http
            .get(&url)
            .header("Authorization", self.bearer().await)
            .send()
            .await?;

        let raw: RawAccount = Self::check(resp).await?.json().await?;
        Ok(raw.into_balances())
    }
}
