//! Open position model and its lifecycle state.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::instrument::Instrument;
use super::SignalKind;

/// Direction of the position relative to the instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        }
    }

    /// True when `price` is at or beyond `level` in the losing direction.
    pub fn breaches(&self, price: Decimal, level: Decimal) -> bool {
        match self {
            Side::Long => price <= level,
            Side::Short => price >= level,
        }
    }

    /// True when `a` is more favorable to the holder than `b`.
    pub fn improves(&self, a: Decimal, b: Decimal) -> bool {
        match self {
            Side::Long => a > b,
            Side::Short => a < b,
        }
    }
}

/// Where the position is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionState {
    Entering,
    Open,
    PartiallyClosed,
    Exiting,
    Closed,
}

/// A live position being managed by the lifecycle state machine.
///
/// `stop_price` and `trailing_stop` only ever move in the holder-favorable
/// direction after entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,

    /// Snapshot of the instrument at entry; quotes are refreshed separately
    pub instrument: Instrument,

    pub side: Side,

    /// Contracts or shares currently held
    pub quantity: u32,

    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,

    /// Hard stop; promoted to breakeven after a partial take-profit
    pub stop_price: Decimal,

    /// Partial take-profit trigger
    pub target_price: Decimal,

    pub signal_kind: SignalKind,

    /// Partial take-profit already taken
    pub partial_filled: bool,

    /// Trailing stop armed (activation threshold reached)
    pub trailing_armed: bool,

    /// Best price seen since arming (lowest for shorts)
    pub high_water_mark: Decimal,

    /// Trailing stop level, ratchets with the high-water mark
    pub trailing_stop: Decimal,

    pub state: PositionState,
}

impl Position {
    pub fn new(
        instrument: Instrument,
        side: Side,
        quantity: u32,
        entry_price: Decimal,
        stop_price: Decimal,
        target_price: Decimal,
        signal_kind: SignalKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            instrument,
            side,
            quantity,
            entry_price,
            entry_time: Utc::now(),
            stop_price,
            target_price,
            signal_kind,
            partial_filled: false,
            trailing_armed: false,
            high_water_mark: entry_price,
            trailing_stop: Decimal::ZERO,
            state: PositionState::Open,
        }
    }

    /// Signed gain as a percentage of entry, positive when the holder wins.
    pub fn gain_pct(&self, price: Decimal) -> Decimal {
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }
        let raw = (price - self.entry_price) / self.entry_price * Decimal::ONE_HUNDRED;
        match self.side {
            Side::Long => raw,
            Side::Short => -raw,
        }
    }

    /// Dollar P&L for `quantity` units closed at `exit_price`.
    pub fn pnl_dollars(&self, exit_price: Decimal, quantity: u32) -> Decimal {
        let diff = match self.side {
            Side::Long => exit_price - self.entry_price,
            Side::Short => self.entry_price - exit_price,
        };
        diff * Decimal::from(quantity) * self.instrument.multiplier
    }

    /// Minutes the position has been held as of `now`.
    pub fn held_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.entry_time).num_minutes()
    }

    /// Raise the stop to at least breakeven. Never lowers it.
    pub fn promote_stop_to_breakeven(&mut self) {
        if self.side.improves(self.entry_price, self.stop_price) {
            self.stop_price = self.entry_price;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::instrument::{Instrument, InstrumentKind};
    use rust_decimal_macros::dec;

    fn option_position(side: Side, entry: Decimal, stop: Decimal) -> Position {
        let instrument = Instrument {
            id: "SPY240119C00470000".to_string(),
            underlying: "SPY".to_string(),
            kind: InstrumentKind::Call,
            bid: entry - dec!(0.05),
            ask: entry + dec!(0.05),
            last: entry,
            metric: dec!(0.45),
            volume: 500,
            open_interest: 2_000,
            multiplier: dec!(100),
        };
        Position::new(instrument, side, 2, entry, stop, entry * dec!(1.5), SignalKind::MomentumUp)
    }

    #[test]
    fn test_gain_pct_sides() {
        let long = option_position(Side::Long, dec!(2.00), dec!(1.50));
        assert_eq!(long.gain_pct(dec!(2.50)), dec!(25));
        assert_eq!(long.gain_pct(dec!(1.50)), dec!(-25));

        let short = option_position(Side::Short, dec!(2.00), dec!(2.50));
        assert_eq!(short.gain_pct(dec!(1.50)), dec!(25));
    }

    #[test]
    fn test_pnl_uses_multiplier() {
        let pos = option_position(Side::Long, dec!(2.00), dec!(1.50));
        // 2 contracts, +0.50 per contract, x100 multiplier
        assert_eq!(pos.pnl_dollars(dec!(2.50), 2), dec!(100));
        assert_eq!(pos.pnl_dollars(dec!(1.80), 2), dec!(-40));
    }

    #[test]
    fn test_breakeven_promotion_never_lowers() {
        let mut pos = option_position(Side::Long, dec!(2.00), dec!(1.50));
        pos.promote_stop_to_breakeven();
        assert_eq!(pos.stop_price, dec!(2.00));

        // Stop already above entry stays put
        pos.stop_price = dec!(2.20);
        pos.promote_stop_to_breakeven();
        assert_eq!(pos.stop_price, dec!(2.20));
    }

    #[test]
    fn test_side_breaches() {
        assert!(Side::Long.breaches(dec!(1.49), dec!(1.50)));
        assert!(Side::Long.breaches(dec!(1.50), dec!(1.50)));
        assert!(!Side::Long.breaches(dec!(1.51), dec!(1.50)));

        assert!(Side::Short.breaches(dec!(2.51), dec!(2.50)));
        assert!(!Side::Short.breaches(dec!(2.49), dec!(2.50)));
    }
}
