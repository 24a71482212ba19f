//! Position lifecycle: the fixed-priority exit ladder plus external
//! alert handling.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::config::ExitConfig;
use crate::models::{ExitReason, Position, Side};

/// Externally raised alert (webhook side channel).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    StopOut,
    Breakeven,
    Timeout,
    TakeProfit,
}

/// What the engine should do with the position this tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitDecision {
    Hold,
    /// Close the full remaining quantity
    Close { reason: ExitReason },
    /// Close part of the position; the remainder keeps running with the
    /// stop promoted to breakeven
    Partial { quantity: u32 },
}

/// Evaluates one open position per tick. Exit conditions are checked in a
/// fixed priority order and the first match wins; queued alerts preempt
/// the scheduled ladder.
pub struct LifecycleManager {
    config: ExitConfig,
    alerts: mpsc::Receiver<Alert>,
}

impl LifecycleManager {
    /// Returns the manager and the sender half handed to the alert source.
    pub fn new(config: ExitConfig) -> (Self, mpsc::Sender<Alert>) {
        let (tx, rx) = mpsc::channel(16);
        (
            Self {
                config,
                alerts: rx,
            },
            tx,
        )
    }

    /// Run one evaluation pass. Ratchet state (trailing arm, high-water
    /// mark, partial flag, stop promotion) is updated in place.
    pub fn evaluate(
        &mut self,
        position: &mut Position,
        price: Decimal,
        now: DateTime<Utc>,
        past_eod: bool,
    ) -> ExitDecision {
        if let Some(decision) = self.drain_alerts(position) {
            return decision;
        }

        // 1. hard stop
        if position.side.breaches(price, position.stop_price) {
            info!(id = %position.id, %price, stop = %position.stop_price, "stop breached");
            return ExitDecision::Close {
                reason: ExitReason::StopLoss,
            };
        }

        // 2. partial take-profit, once; the rest of the ladder waits a tick
        if !position.partial_filled
            && position.gain_pct(price) >= self.config.partial_tp_pct
        {
            position.partial_filled = true;
            position.promote_stop_to_breakeven();

            let quantity = self.partial_quantity(position.quantity);
            info!(id = %position.id, quantity, "partial take-profit, stop at breakeven");
            if quantity >= position.quantity {
                // One-lot position: the partial is the whole position.
                return ExitDecision::Close {
                    reason: ExitReason::TakeProfit,
                };
            }
            return ExitDecision::Partial { quantity };
        }

        // 3. trailing stop
        self.update_trailing(position, price);
        if position.trailing_armed && position.side.breaches(price, position.trailing_stop) {
            info!(id = %position.id, %price, trail = %position.trailing_stop, "trailing stop hit");
            return ExitDecision::Close {
                reason: ExitReason::TrailingStop,
            };
        }

        // 4. max hold time
        if position.held_minutes(now) >= self.config.max_hold_minutes {
            return ExitDecision::Close {
                reason: ExitReason::TimeLimit,
            };
        }

        // 5. end of day
        if past_eod {
            return ExitDecision::Close {
                reason: ExitReason::EndOfDay,
            };
        }

        ExitDecision::Hold
    }

    /// Apply every queued alert. Forced exits win over promotions.
    fn drain_alerts(&mut self, position: &mut Position) -> Option<ExitDecision> {
        let mut forced: Option<ExitReason> = None;
        while let Ok(alert) = self.alerts.try_recv() {
            debug!(id = %position.id, ?alert, "external alert");
            match alert {
                Alert::StopOut => forced = Some(ExitReason::StopLoss),
                Alert::Timeout => forced = Some(ExitReason::TimeLimit),
                Alert::TakeProfit => forced = Some(ExitReason::TakeProfit),
                Alert::Breakeven => position.promote_stop_to_breakeven(),
            }
        }
        forced.map(|reason| ExitDecision::Close { reason })
    }

    fn partial_quantity(&self, total: u32) -> u32 {
        let q = (Decimal::from(total) * self.config.partial_fraction)
            .floor()
            .to_u32()
            .unwrap_or(0);
        q.max(1)
    }

    /// Arm at the activation threshold; afterwards the high-water mark and
    /// trail only ever move in the holder's favor.
    fn update_trailing(&self, position: &mut Position, price: Decimal) {
        if !position.trailing_armed {
            if position.gain_pct(price) >= self.config.trailing_activation_pct {
                position.trailing_armed = true;
                position.high_water_mark = price;
                position.trailing_stop = self.trail_from(position.side, price);
                debug!(id = %position.id, hwm = %price, trail = %position.trailing_stop, "trailing armed");
            }
            return;
        }

        if position.side.improves(price, position.high_water_mark) {
            position.high_water_mark = price;
            let candidate = self.trail_from(position.side, price);
            if position.side.improves(candidate, position.trailing_stop) {
                position.trailing_stop = candidate;
            }
        }
    }

    fn trail_from(&self, side: Side, hwm: Decimal) -> Decimal {
        let distance = hwm * self.config.trailing_distance_pct / Decimal::ONE_HUNDRED;
        match side {
            Side::Long => hwm - distance,
            Side::Short => hwm + distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Instrument, InstrumentKind, SignalKind};
    use rust_decimal_macros::dec;

    fn instrument() -> Instrument {
        Instrument {
            id: "SPY   250825C00470000".to_string(),
            underlying: "SPY".to_string(),
            kind: InstrumentKind::Call,
            bid: dec!(1.95),
            ask: dec!(2.05),
            last: dec!(2.00),
            metric: dec!(0.45),
            volume: 500,
            open_interest: 2_000,
            multiplier: dec!(100),
        }
    }

    fn long_position(quantity: u32) -> Position {
        // entry 2.00, stop 1.50 (-25%), target never used directly
        Position::new(
            instrument(),
            Side::Long,
            quantity,
            dec!(2.00),
            dec!(1.50),
            dec!(3.00),
            SignalKind::MomentumUp,
        )
    }

    fn short_position(quantity: u32) -> Position {
        Position::new(
            instrument(),
            Side::Short,
            quantity,
            dec!(2.00),
            dec!(2.50),
            dec!(1.00),
            SignalKind::MomentumDown,
        )
    }

    fn manager() -> (LifecycleManager, mpsc::Sender<Alert>) {
        LifecycleManager::new(ExitConfig::default())
    }

    #[test]
    fn test_stop_loss_fires_first() {
        let (mut m, _tx) = manager();
        let mut pos = long_position(4);
        let d = m.evaluate(&mut pos, dec!(1.50), Utc::now(), false);
        assert_eq!(
            d,
            ExitDecision::Close {
                reason: ExitReason::StopLoss
            }
        );
    }

    #[test]
    fn test_partial_once_with_breakeven() {
        let (mut m, _tx) = manager();
        let mut pos = long_position(4);

        // +50% triggers the partial
        let d = m.evaluate(&mut pos, dec!(3.00), Utc::now(), false);
        assert_eq!(d, ExitDecision::Partial { quantity: 2 });
        assert!(pos.partial_filled);
        assert_eq!(pos.stop_price, dec!(2.00)); // breakeven

        // Same gain again: no second partial. Trailing arms instead
        // (50% >= 30% activation) but nothing breaches.
        pos.quantity = 2;
        let d = m.evaluate(&mut pos, dec!(3.00), Utc::now(), false);
        assert_eq!(d, ExitDecision::Hold);
        assert!(pos.trailing_armed);
    }

    #[test]
    fn test_partial_on_one_lot_closes_fully() {
        let (mut m, _tx) = manager();
        let mut pos = long_position(1);
        let d = m.evaluate(&mut pos, dec!(3.00), Utc::now(), false);
        assert_eq!(
            d,
            ExitDecision::Close {
                reason: ExitReason::TakeProfit
            }
        );
    }

    #[test]
    fn test_trailing_ratchets_monotonically() {
        let (mut m, _tx) = manager();
        let mut pos = long_position(2);
        pos.partial_filled = true; // keep the partial out of the way

        // +30% arms: hwm 2.60, trail 2.60 * 0.85 = 2.21
        assert_eq!(m.evaluate(&mut pos, dec!(2.60), Utc::now(), false), ExitDecision::Hold);
        assert!(pos.trailing_armed);
        assert_eq!(pos.trailing_stop, dec!(2.21));

        // new high ratchets the trail up
        m.evaluate(&mut pos, dec!(3.00), Utc::now(), false);
        assert_eq!(pos.high_water_mark, dec!(3.00));
        assert_eq!(pos.trailing_stop, dec!(2.55));

        // pullback above the trail never lowers it
        m.evaluate(&mut pos, dec!(2.70), Utc::now(), false);
        assert_eq!(pos.trailing_stop, dec!(2.55));

        // breach closes
        let d = m.evaluate(&mut pos, dec!(2.50), Utc::now(), false);
        assert_eq!(
            d,
            ExitDecision::Close {
                reason: ExitReason::TrailingStop
            }
        );
    }

    #[test]
    fn test_short_side_mirrors() {
        let (mut m, _tx) = manager();
        let mut pos = short_position(2);
        pos.partial_filled = true;

        // -30% move in price = +30% gain for the short: arms at 1.40,
        // trail 1.40 * 1.15 = 1.61
        m.evaluate(&mut pos, dec!(1.40), Utc::now(), false);
        assert!(pos.trailing_armed);
        assert_eq!(pos.trailing_stop, dec!(1.61));

        // lower low ratchets the trail down
        m.evaluate(&mut pos, dec!(1.20), Utc::now(), false);
        assert_eq!(pos.trailing_stop, dec!(1.38));

        // bounce through the trail closes
        let d = m.evaluate(&mut pos, dec!(1.40), Utc::now(), false);
        assert_eq!(
            d,
            ExitDecision::Close {
                reason: ExitReason::TrailingStop
            }
        );

        // and the hard stop works in the short direction
        let mut pos = short_position(2);
        let d = m.evaluate(&mut pos, dec!(2.50), Utc::now(), false);
        assert_eq!(
            d,
            ExitDecision::Close {
                reason: ExitReason::StopLoss
            }
        );
    }

    #[test]
    fn test_time_limit() {
        let (mut m, _tx) = manager();
        let mut pos = long_position(2);
        pos.entry_time = Utc::now() - chrono::Duration::minutes(45);
        let d = m.evaluate(&mut pos, dec!(2.10), Utc::now(), false);
        assert_eq!(
            d,
            ExitDecision::Close {
                reason: ExitReason::TimeLimit
            }
        );
    }

    #[test]
    fn test_eod_exit() {
        let (mut m, _tx) = manager();
        let mut pos = long_position(2);
        let d = m.evaluate(&mut pos, dec!(2.10), Utc::now(), true);
        assert_eq!(
            d,
            ExitDecision::Close {
                reason: ExitReason::EndOfDay
            }
        );
    }

    #[tokio::test]
    async fn test_alert_forces_exit() {
        let (mut m, tx) = manager();
        let mut pos = long_position(2);
        tx.send(Alert::StopOut).await.unwrap();

        // price looks healthy; the alert still closes it
        let d = m.evaluate(&mut pos, dec!(2.10), Utc::now(), false);
        assert_eq!(
            d,
            ExitDecision::Close {
                reason: ExitReason::StopLoss
            }
        );
    }

    #[tokio::test]
    async fn test_breakeven_alert_promotes_only() {
        let (mut m, tx) = manager();
        let mut pos = long_position(2);
        tx.send(Alert::Breakeven).await.unwrap();

        let d = m.evaluate(&mut pos, dec!(2.10), Utc::now(), false);
        assert_eq!(d, ExitDecision::Hold);
        assert_eq!(pos.stop_price, dec!(2.00));
    }

    #[tokio::test]
    async fn test_queued_alerts_drain_in_one_tick() {
        let (mut m, tx) = manager();
        let mut pos = long_position(2);
        tx.send(Alert::Breakeven).await.unwrap();
        tx.send(Alert::Timeout).await.unwrap();

        let d = m.evaluate(&mut pos, dec!(2.10), Utc::now(), false);
        // both applied: stop promoted and the exit forced
        assert_eq!(pos.stop_price, dec!(2.00));
        assert_eq!(
            d,
            ExitDecision::Close {
                reason: ExitReason::TimeLimit
            }
        );
    }
}
