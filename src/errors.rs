//! Broker error taxonomy.
//!
//! Raw transport/API failures are classified at the boundary so the engine
//! can decide: skip the tick, treat as a fill failure inside the chase
//! loop, or halt startup.

use thiserror::Error;

/// Errors surfaced by the broker API layer.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Network-level failure; the caller retries on the next loop tick.
    #[error("transient network error: {0}")]
    Transient(#[from] reqwest::Error),

    /// Quote endpoint returned nothing usable for the symbol.
    #[error("quote unavailable for {0}")]
    QuoteUnavailable(String),

    /// Broker refused the order outright (not a chase-loop status).
    #[error("order rejected: {0}")]
    OrderRejected(String),

    /// Authentication/session failure. Fatal at startup.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-success HTTP response from the broker.
    #[error("broker API error {status}: {body}")]
    Api { status: u16, body: String },
}

impl BrokerError {
    /// True when the sensible recovery is to wait for the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, BrokerError::Transient(_) | BrokerError::QuoteUnavailable(_))
    }
}
