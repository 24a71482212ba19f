//! Gap candidate from the pre-market scanner watchlist.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of the scanner's ranked watchlist.
///
/// Produced externally (the scanner handles news/quote collection) and
/// loaded from a JSON file; the gap selector re-scores and filters but
/// never re-derives these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub symbol: String,

    /// Current (pre-market or open) price
    pub price: Decimal,

    pub prev_close: Decimal,

    /// Gap from previous close, percent
    pub gap_pct: Decimal,

    /// Session volume so far
    pub volume: u64,

    /// Trailing average daily volume; 0 when unknown
    #[serde(default)]
    pub avg_volume: u64,

    /// Day's high/low so far
    #[serde(default)]
    pub day_high: Decimal,
    #[serde(default)]
    pub day_low: Decimal,

    /// Headline driving the gap, if the scanner found one
    #[serde(default)]
    pub catalyst: Option<String>,

    /// Selector-assigned score; 0 until scored
    #[serde(default)]
    pub score: Decimal,
}

impl Candidate {
    /// Session volume relative to average. None when no average is known.
    pub fn relative_volume(&self) -> Option<Decimal> {
        if self.avg_volume == 0 {
            return None;
        }
        Some(Decimal::from(self.volume) / Decimal::from(self.avg_volume))
    }
}

/// Load a ranked watchlist from the scanner's JSON output.
pub fn load_watchlist(path: &std::path::Path) -> anyhow::Result<Vec<Candidate>> {
    let raw = std::fs::read_to_string(path)?;
    let candidates: Vec<Candidate> = serde_json::from_str(&raw)?;
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_relative_volume() {
        let mut c = Candidate {
            symbol: "ABCD".to_string(),
            price: dec!(7.50),
            prev_close: dec!(6.00),
            gap_pct: dec!(25),
            volume: 4_000_000,
            avg_volume: 800_000,
            day_high: dec!(7.80),
            day_low: dec!(6.90),
            catalyst: None,
            score: Decimal::ZERO,
        };
        assert_eq!(c.relative_volume(), Some(dec!(5)));

        c.avg_volume = 0;
        assert_eq!(c.relative_volume(), None);
    }

    #[test]
    fn test_watchlist_json_shape() {
        let raw = r#"[{
            "symbol": "ABCD",
            "price": "7.50",
            "prev_close": "6.00",
            "gap_pct": "25.0",
            "volume": 4000000,
            "avg_volume": 800000,
            "catalyst": "FDA approval granted"
        }]"#;
        let list: Vec<Candidate> = serde_json::from_str(raw).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].symbol, "ABCD");
        assert_eq!(list[0].catalyst.as_deref(), Some("FDA approval granted"));
        assert_eq!(list[0].score, Decimal::ZERO);
    }
}
