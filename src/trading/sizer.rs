//! Position sizing: the smallest of the risk, position-cap, and cash legs.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::debug;

use super::config::SizerConfig;
use crate::api::types::Balances;

pub struct PositionSizer {
    config: SizerConfig,
    /// Max position cost as percent of equity, shared with the risk gate
    max_position_pct: Decimal,
}

impl PositionSizer {
    pub fn new(config: SizerConfig, max_position_pct: Decimal) -> Self {
        Self {
            config,
            max_position_pct,
        }
    }

    /// Units (contracts or shares) to buy. 0 means "cannot enter".
    ///
    /// Each leg floors independently; the final size is the minimum of the
    /// three, never negative.
    pub fn size(
        &self,
        entry_price: Decimal,
        stop_price: Decimal,
        unit_cost: Decimal,
        balances: &Balances,
    ) -> u32 {
        let risk_per_unit = (entry_price - stop_price).abs();
        if risk_per_unit <= Decimal::ZERO || unit_cost <= Decimal::ZERO {
            return 0;
        }

        let risk_budget = (balances.equity * self.config.risk_pct / Decimal::ONE_HUNDRED)
            .min(self.config.hard_risk_cap);
        let by_risk = (risk_budget / risk_per_unit).floor();

        let position_budget = balances.equity * self.max_position_pct / Decimal::ONE_HUNDRED;
        let by_position_cap = (position_budget / unit_cost).floor();

        let free_cash = (balances.available_cash - self.config.cash_buffer).max(Decimal::ZERO);
        let by_cash = (free_cash / unit_cost).floor();

        let units = by_risk
            .min(by_position_cap)
            .min(by_cash)
            .max(Decimal::ZERO);

        debug!(%by_risk, %by_position_cap, %by_cash, %units, "position sized");
        units.to_u32().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn balances(equity: Decimal, cash: Decimal) -> Balances {
        Balances {
            equity,
            available_cash: cash,
            is_margin_account: false,
        }
    }

    fn sizer(config: SizerConfig) -> PositionSizer {
        PositionSizer::new(config, dec!(50))
    }

    #[test]
    fn test_position_cap_binds() {
        // risk leg allows 60 (min(300, 150) / 2.50), the 50% position cap
        // allows only 50
        let s = sizer(SizerConfig {
            risk_pct: dec!(3),
            hard_risk_cap: dec!(150),
            cash_buffer: dec!(0),
        });
        let units = s.size(
            dec!(100),
            dec!(97.50),
            dec!(100),
            &balances(dec!(10000), dec!(10000)),
        );
        assert_eq!(units, 50);
    }

    #[test]
    fn test_small_account_cap_binds() {
        // risk leg 21/0.125 = 168, cash leg (600-100)/5 = 100,
        // position cap 350/5 = 70
        let s = sizer(SizerConfig {
            risk_pct: dec!(3),
            hard_risk_cap: dec!(150),
            cash_buffer: dec!(100),
        });
        let units = s.size(dec!(5.00), dec!(4.875), dec!(5.00), &balances(dec!(700), dec!(600)));
        assert_eq!(units, 70);
    }

    #[test]
    fn test_never_exceeds_any_leg() {
        let s = sizer(SizerConfig {
            risk_pct: dec!(3),
            hard_risk_cap: dec!(150),
            cash_buffer: dec!(100),
        });
        let b = balances(dec!(10000), dec!(2000));
        let entry = dec!(2.50);
        let stop = dec!(1.875);
        let unit_cost = dec!(250); // option contract

        let units = Decimal::from(s.size(entry, stop, unit_cost, &b));
        let by_risk = (dec!(150) / dec!(0.625)).floor();
        let by_cap = (dec!(5000) / unit_cost).floor();
        let by_cash = (dec!(1900) / unit_cost).floor();
        assert!(units <= by_risk && units <= by_cap && units <= by_cash);
        assert_eq!(units, dec!(7)); // cash leg binds
    }

    #[test]
    fn test_zero_when_stop_at_entry() {
        let s = sizer(SizerConfig::default());
        assert_eq!(
            s.size(dec!(2.50), dec!(2.50), dec!(250), &balances(dec!(10000), dec!(5000))),
            0
        );
    }

    #[test]
    fn test_zero_when_cash_below_buffer() {
        let s = sizer(SizerConfig {
            risk_pct: dec!(3),
            hard_risk_cap: dec!(150),
            cash_buffer: dec!(100),
        });
        assert_eq!(
            s.size(dec!(2.50), dec!(2.00), dec!(250), &balances(dec!(10000), dec!(80))),
            0
        );
    }
}
