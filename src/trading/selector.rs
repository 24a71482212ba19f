//! Candidate selection: pick one option contract by delta fit, or one
//! gapping equity by composite score.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::debug;

use super::config::SelectorConfig;
use super::signal::Direction;
use crate::models::{Candidate, Instrument, InstrumentKind};

/// Catalyst keywords that mark a gap as news-driven enough to chase.
const STRONG_CATALYSTS: &[&str] = &[
    "fda", "approval", "merger", "acquisition", "buyout", "partnership", "contract", "earnings",
];

/// Why candidates were discarded, for per-tick observability logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectionCounts {
    /// Unusable quote (empty book)
    pub quote: u32,
    pub premium: u32,
    pub spread: u32,
    pub volume: u32,
    pub open_interest: u32,
    /// Price outside the configured band
    pub price_band: u32,
    pub gap: u32,
    pub relative_volume: u32,
}

impl RejectionCounts {
    pub fn total(&self) -> u32 {
        self.quote
            + self.premium
            + self.spread
            + self.volume
            + self.open_interest
            + self.price_band
            + self.gap
            + self.relative_volume
    }
}

/// Result of one selection pass.
#[derive(Debug, Clone)]
pub struct Selection<T> {
    pub chosen: Option<T>,
    pub rejections: RejectionCounts,
}

pub struct CandidateSelector {
    config: SelectorConfig,
}

impl CandidateSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Pick the contract whose delta best fits the target for the signal
    /// direction. Lower score wins: delta miss plus double-weighted spread,
    /// minus a small liquidity credit.
    pub fn select_option(
        &self,
        chain: &[Instrument],
        direction: Direction,
    ) -> Selection<Instrument> {
        let wanted_kind = match direction {
            Direction::Up => InstrumentKind::Call,
            Direction::Down => InstrumentKind::Put,
        };
        let target_delta = match direction {
            Direction::Up => self.config.target_delta,
            Direction::Down => -self.config.target_delta,
        };

        let mut rejections = RejectionCounts::default();
        let mut best: Option<(Decimal, &Instrument)> = None;

        for contract in chain.iter().filter(|c| c.kind == wanted_kind) {
            if contract.bid <= Decimal::ZERO || contract.ask <= Decimal::ZERO {
                rejections.quote += 1;
                continue;
            }
            if contract.mid() < self.config.min_premium {
                rejections.premium += 1;
                continue;
            }
            if contract.spread_pct() > self.config.max_spread_pct {
                rejections.spread += 1;
                continue;
            }
            if contract.volume < self.config.min_volume {
                rejections.volume += 1;
                continue;
            }
            if contract.open_interest < self.config.min_open_interest {
                rejections.open_interest += 1;
                continue;
            }

            let liquidity_credit =
                (Decimal::from(contract.volume) / dec!(10000)).min(dec!(0.1));
            let score = (target_delta - contract.metric).abs()
                + Decimal::TWO * contract.spread_pct()
                - liquidity_credit;

            if best.map_or(true, |(s, _)| score < s) {
                best = Some((score, contract));
            }
        }

        if let Some((score, contract)) = best {
            debug!(contract = %contract.id, %score, rejected = rejections.total(), "contract selected");
        }

        Selection {
            chosen: best.map(|(_, c)| c.clone()),
            rejections,
        }
    }

    /// Rank the scanner watchlist and pick the strongest gap. Higher score
    /// wins. Gaps without news score a heavy penalty since they tend to
    /// fade.
    pub fn select_gap(&self, watchlist: &[Candidate]) -> Selection<Candidate> {
        let mut rejections = RejectionCounts::default();
        let mut best: Option<Candidate> = None;

        for candidate in watchlist {
            if candidate.price < self.config.min_price || candidate.price > self.config.max_price {
                rejections.price_band += 1;
                continue;
            }
            if candidate.gap_pct < self.config.min_gap_pct {
                rejections.gap += 1;
                continue;
            }
            let rvol = candidate.relative_volume();
            if let Some(rvol) = rvol {
                if rvol < self.config.min_relative_volume {
                    rejections.relative_volume += 1;
                    continue;
                }
            }

            let score = Self::gap_score(candidate, rvol);
            if best.as_ref().map_or(true, |b| score > b.score) {
                let mut chosen = candidate.clone();
                chosen.score = score;
                best = Some(chosen);
            }
        }

        if let Some(candidate) = &best {
            debug!(symbol = %candidate.symbol, score = %candidate.score, rejected = rejections.total(), "gap candidate selected");
        }

        Selection {
            chosen: best,
            rejections,
        }
    }

    fn gap_score(candidate: &Candidate, rvol: Option<Decimal>) -> Decimal {
        let gap_term = candidate.gap_pct.min(dec!(30));
        let rvol_term = rvol.map_or(Decimal::ONE, |r| r.min(dec!(10)));
        let bucket = Self::price_bucket_bonus(candidate.price);
        let catalyst = Self::catalyst_multiplier(candidate.catalyst.as_deref());
        gap_term * rvol_term * bucket * catalyst
    }

    /// Low-float sweet spot gets the biggest bonus.
    fn price_bucket_bonus(price: Decimal) -> Decimal {
        if price >= dec!(5) && price <= dec!(20) {
            dec!(2.0)
        } else if (price >= dec!(2) && price < dec!(5)) || (price > dec!(20) && price <= dec!(30)) {
            dec!(1.5)
        } else {
            Decimal::ONE
        }
    }

    fn catalyst_multiplier(catalyst: Option<&str>) -> Decimal {
        match catalyst {
            Some(headline) => {
                let lower = headline.to_lowercase();
                if STRONG_CATALYSTS.iter().any(|kw| lower.contains(kw)) {
                    dec!(2.0)
                } else {
                    dec!(1.5)
                }
            }
            None => dec!(0.4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contract(
        id: &str,
        kind: InstrumentKind,
        bid: Decimal,
        ask: Decimal,
        delta: Decimal,
        volume: u64,
        oi: u64,
    ) -> Instrument {
        Instrument {
            id: id.to_string(),
            underlying: "SPY".to_string(),
            kind,
            bid,
            ask,
            last: bid,
            metric: delta,
            volume,
            open_interest: oi,
            multiplier: dec!(100),
        }
    }

    fn candidate(symbol: &str, price: Decimal, gap: Decimal, catalyst: Option<&str>) -> Candidate {
        Candidate {
            symbol: symbol.to_string(),
            price,
            prev_close: price / (Decimal::ONE + gap / Decimal::ONE_HUNDRED),
            gap_pct: gap,
            volume: 3_000_000,
            avg_volume: 600_000, // rvol 5
            day_high: price,
            day_low: price * dec!(0.9),
            catalyst: catalyst.map(str::to_string),
            score: Decimal::ZERO,
        }
    }

    fn selector() -> CandidateSelector {
        CandidateSelector::new(SelectorConfig::default())
    }

    #[test]
    fn test_option_hard_filters_tallied() {
        let chain = vec![
            contract("A", InstrumentKind::Call, dec!(0), dec!(0.50), dec!(0.45), 500, 1000),
            contract("B", InstrumentKind::Call, dec!(0.10), dec!(0.14), dec!(0.45), 500, 1000),
            contract("C", InstrumentKind::Call, dec!(1.00), dec!(1.40), dec!(0.45), 500, 1000),
            contract("D", InstrumentKind::Call, dec!(1.00), dec!(1.05), dec!(0.45), 10, 1000),
            contract("E", InstrumentKind::Call, dec!(1.00), dec!(1.05), dec!(0.45), 500, 10),
        ];
        let selection = selector().select_option(&chain, Direction::Up);
        assert!(selection.chosen.is_none());
        assert_eq!(selection.rejections.quote, 1);
        assert_eq!(selection.rejections.premium, 1);
        assert_eq!(selection.rejections.spread, 1);
        assert_eq!(selection.rejections.volume, 1);
        assert_eq!(selection.rejections.open_interest, 1);
        assert_eq!(selection.rejections.total(), 5);
    }

    #[test]
    fn test_option_best_delta_fit_wins() {
        let chain = vec![
            contract("FAR", InstrumentKind::Call, dec!(1.00), dec!(1.04), dec!(0.70), 500, 1000),
            contract("FIT", InstrumentKind::Call, dec!(1.00), dec!(1.04), dec!(0.46), 500, 1000),
        ];
        let selection = selector().select_option(&chain, Direction::Up);
        assert_eq!(selection.chosen.unwrap().id, "FIT");
    }

    #[test]
    fn test_option_spread_breaks_delta_tie() {
        // Equal delta miss; the tighter spread must win.
        let chain = vec![
            contract("WIDE", InstrumentKind::Call, dec!(0.95), dec!(1.07), dec!(0.45), 500, 1000),
            contract("TIGHT", InstrumentKind::Call, dec!(1.00), dec!(1.02), dec!(0.45), 500, 1000),
        ];
        let selection = selector().select_option(&chain, Direction::Up);
        assert_eq!(selection.chosen.unwrap().id, "TIGHT");
    }

    #[test]
    fn test_down_signal_picks_puts() {
        let chain = vec![
            contract("CALL", InstrumentKind::Call, dec!(1.00), dec!(1.04), dec!(0.45), 500, 1000),
            contract("PUT", InstrumentKind::Put, dec!(1.00), dec!(1.04), dec!(-0.44), 500, 1000),
        ];
        let selection = selector().select_option(&chain, Direction::Down);
        assert_eq!(selection.chosen.unwrap().id, "PUT");
    }

    #[test]
    fn test_gap_filters() {
        let watchlist = vec![
            candidate("CHEAP", dec!(1.50), dec!(25), Some("FDA approval")),
            candidate("SMALLGAP", dec!(8.00), dec!(5), Some("FDA approval")),
            {
                let mut thin = candidate("THIN", dec!(8.00), dec!(25), Some("FDA approval"));
                thin.volume = 600_000; // rvol 1
                thin
            },
        ];
        let selection = selector().select_gap(&watchlist);
        assert!(selection.chosen.is_none());
        assert_eq!(selection.rejections.price_band, 1);
        assert_eq!(selection.rejections.gap, 1);
        assert_eq!(selection.rejections.relative_volume, 1);
    }

    #[test]
    fn test_gap_scoring_and_catalyst() {
        // Same gap and rvol; strong catalyst in the sweet-spot bucket wins.
        let watchlist = vec![
            candidate("NONEWS", dec!(8.00), dec!(25), None),
            candidate("SOFT", dec!(8.00), dec!(25), Some("unusual volume noted")),
            candidate("STRONG", dec!(8.00), dec!(25), Some("Merger agreement announced")),
        ];
        let selection = selector().select_gap(&watchlist);
        let chosen = selection.chosen.unwrap();
        assert_eq!(chosen.symbol, "STRONG");
        // 25 x 5 x 2.0 (bucket) x 2.0 (strong catalyst)
        assert_eq!(chosen.score, dec!(500));
    }

    #[test]
    fn test_gap_cap_terms() {
        // gap capped at 30, rvol capped at 10
        let mut huge = candidate("HUGE", dec!(8.00), dec!(80), Some("merger"));
        huge.volume = 30_000_000; // rvol 50
        let selection = selector().select_gap(&[huge]);
        // 30 x 10 x 2.0 x 2.0
        assert_eq!(selection.chosen.unwrap().score, dec!(1200));
    }
}
