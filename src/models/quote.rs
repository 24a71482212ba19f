//! Quote snapshot for an underlying symbol.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Immutable point-in-time quote for a tracked symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Ticker symbol (e.g., "SPY")
    pub symbol: String,

    /// When the quote was observed
    pub timestamp: DateTime<Utc>,

    /// Last traded price
    pub last: Decimal,

    /// Best bid
    pub bid: Decimal,

    /// Best ask
    pub ask: Decimal,

    /// Cumulative session volume
    pub volume: u64,
}

impl Quote {
    /// Midpoint of bid/ask, falling back to last when the book is empty.
    pub fn mid(&self) -> Decimal {
        if self.bid > Decimal::ZERO && self.ask > Decimal::ZERO {
            (self.bid + self.ask) / Decimal::TWO
        } else {
            self.last
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mid_fallback() {
        let mut quote = Quote {
            symbol: "SPY".to_string(),
            timestamp: Utc::now(),
            last: dec!(450.10),
            bid: dec!(450.05),
            ask: dec!(450.15),
            volume: 1_000,
        };
        assert_eq!(quote.mid(), dec!(450.10));

        quote.bid = Decimal::ZERO;
        assert_eq!(quote.mid(), dec!(450.10)); // falls back to last
    }
}
