//! Short-window momentum detection over a stream of quotes.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

use super::config::SignalConfig;
use crate::models::Quote;

/// Direction of a momentum move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// A momentum move that cleared the threshold inside the window.
#[derive(Debug, Clone)]
pub struct Signal {
    pub symbol: String,
    pub direction: Direction,
    pub reference_price: Decimal,
    pub reference_time: DateTime<Utc>,
    /// Raw move (dollars, or percent of reference in percent mode)
    pub delta: Decimal,
    pub elapsed: Duration,
}

/// Tracks a rolling reference point per symbol and fires when price moves
/// far enough, fast enough.
pub struct SignalDetector {
    config: SignalConfig,
    references: HashMap<String, (Decimal, DateTime<Utc>)>,
}

impl SignalDetector {
    pub fn new(config: SignalConfig) -> Self {
        Self {
            config,
            references: HashMap::new(),
        }
    }

    /// Feed one quote. Emits at most one signal, and only while flat; an
    /// open position swallows triggers but the reference keeps rolling.
    pub fn on_quote(&mut self, quote: &Quote, flat: bool) -> Option<Signal> {
        let price = quote.last;
        let now = quote.timestamp;
        let window = Duration::seconds(self.config.window_secs);

        let Some(&(ref_price, ref_time)) = self.references.get(&quote.symbol) else {
            self.references.insert(quote.symbol.clone(), (price, now));
            return None;
        };

        let elapsed = now - ref_time;
        let delta = if self.config.threshold_is_percent {
            if ref_price.is_zero() {
                Decimal::ZERO
            } else {
                (price - ref_price) / ref_price * Decimal::ONE_HUNDRED
            }
        } else {
            price - ref_price
        };

        let mut signal = None;
        if elapsed <= window && delta.abs() >= self.config.threshold && flat {
            let direction = if delta > Decimal::ZERO {
                Direction::Up
            } else {
                Direction::Down
            };
            debug!(
                symbol = %quote.symbol,
                ?direction,
                %delta,
                elapsed_secs = elapsed.num_seconds(),
                "momentum signal"
            );
            signal = Some(Signal {
                symbol: quote.symbol.clone(),
                direction,
                reference_price: ref_price,
                reference_time: ref_time,
                delta,
                elapsed,
            });
            self.references.insert(quote.symbol.clone(), (price, now));
        }

        // Stale-window reset runs unconditionally, including on a tick that
        // just fired (re-assigns the same value in that case).
        if elapsed >= window {
            self.references.insert(quote.symbol.clone(), (price, now));
        }

        signal
    }

    /// Drop the reference for a symbol (e.g. after an entry fills, so the
    /// next flat tick starts a fresh window).
    pub fn reset(&mut self, symbol: &str) {
        self.references.remove(symbol);
    }
}
