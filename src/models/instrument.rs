//! Tradable instrument: an option contract or the shares themselves.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// What kind of instrument this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstrumentKind {
    Call,
    Put,
    Share,
}

impl InstrumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstrumentKind::Call => "CALL",
            InstrumentKind::Put => "PUT",
            InstrumentKind::Share => "SHARE",
        }
    }
}

/// Snapshot of a tradable instrument from one chain/quote fetch.
///
/// Immutable per fetch; re-fetched via `QuoteSource::instrument_quote` to
/// refresh. `metric` carries the selection metric: delta for options,
/// composite gap score for equities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    /// Broker symbol (OCC symbol for options, ticker for shares)
    pub id: String,

    /// Underlying ticker
    pub underlying: String,

    pub kind: InstrumentKind,

    pub bid: Decimal,
    pub ask: Decimal,
    pub last: Decimal,

    /// Selection metric: signed delta for options, score for equities
    pub metric: Decimal,

    /// Session volume
    pub volume: u64,

    /// Open interest (0 for shares)
    pub open_interest: u64,

    /// Dollar value of one quoted point per unit: 100 for option
    /// contracts, 1 for shares.
    pub multiplier: Decimal,
}

impl Instrument {
    /// A share instrument quoted directly from an underlying quote.
    pub fn share(symbol: &str, bid: Decimal, ask: Decimal, last: Decimal, volume: u64) -> Self {
        Self {
            id: symbol.to_string(),
            underlying: symbol.to_string(),
            kind: InstrumentKind::Share,
            bid,
            ask,
            last,
            metric: Decimal::ZERO,
            volume,
            open_interest: 0,
            multiplier: Decimal::ONE,
        }
    }

    pub fn mid(&self) -> Decimal {
        (self.bid + self.ask) / Decimal::TWO
    }

    /// Marking price for an open position: the bid/ask midpoint, falling
    /// back to the last print when the book is empty. None when the quote
    /// carries no price at all, so a blank refresh never marks a position
    /// at zero.
    pub fn mark(&self) -> Option<Decimal> {
        if self.bid > Decimal::ZERO && self.ask > Decimal::ZERO {
            Some(self.mid())
        } else if self.last > Decimal::ZERO {
            Some(self.last)
        } else {
            None
        }
    }

    pub fn spread(&self) -> Decimal {
        self.ask - self.bid
    }

    /// Spread as a fraction of mid. Returns a large sentinel when the mid
    /// is zero so the contract always fails spread filters.
    pub fn spread_pct(&self) -> Decimal {
        let mid = self.mid();
        if mid > Decimal::ZERO {
            self.spread() / mid
        } else {
            dec!(999)
        }
    }

    /// Dollar cost of one unit at the given per-point price.
    pub fn unit_cost(&self, price: Decimal) -> Decimal {
        price * self.multiplier
    }
}
