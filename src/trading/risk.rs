//! Account-level guardrails evaluated before every entry.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::config::RiskConfig;
use crate::api::types::Balances;

/// Equity floor below which pattern-day-trader limits apply.
const PDT_EQUITY_MIN: Decimal = Decimal::from_parts(25_000, 0, 0, false, 0);
/// Day trades allowed in the trailing window before PDT flags the account.
const PDT_MAX_DAY_TRADES: usize = 3;
/// Trailing window, calendar days.
const PDT_WINDOW_DAYS: i64 = 5;

/// Verdict from the gate. Not an error: blocks are logged decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl GateDecision {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Mutable daily risk counters, persisted across restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskState {
    pub daily_pnl: Decimal,
    pub trades_today: u32,
    pub consecutive_losses: u32,
    /// Round trips opened and closed the same day, for the PDT window
    pub day_trades: Vec<DateTime<Utc>>,
    pub last_reset: NaiveDate,
    pub suspended: bool,
}

impl RiskState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            daily_pnl: Decimal::ZERO,
            trades_today: 0,
            consecutive_losses: 0,
            day_trades: Vec::new(),
            last_reset: today,
            suspended: false,
        }
    }
}

pub struct RiskGate {
    config: RiskConfig,
    state: RiskState,
}

impl RiskGate {
    pub fn new(config: RiskConfig, state: RiskState) -> Self {
        Self { config, state }
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    /// Roll the daily counters on the first touch of a new calendar date.
    /// Idempotent; never fires mid-day. Day trades survive the reset but
    /// only for as long as the PDT window can still see them.
    pub fn touch(&mut self, today: NaiveDate) {
        if today == self.state.last_reset {
            return;
        }
        info!(%today, "daily risk reset");
        let cutoff = today - Duration::days(PDT_WINDOW_DAYS);
        let mut day_trades = std::mem::take(&mut self.state.day_trades);
        day_trades.retain(|t| t.date_naive() >= cutoff);
        self.state = RiskState {
            day_trades,
            ..RiskState::new(today)
        };
    }

    /// Sequential short-circuit checks; the first failure wins.
    pub fn can_trade(
        &mut self,
        position_cost: Decimal,
        balances: &Balances,
        now: DateTime<Utc>,
    ) -> GateDecision {
        if self.state.suspended {
            return GateDecision::deny("trading suspended for the day");
        }

        if self.state.daily_pnl <= -self.config.max_daily_loss {
            self.state.suspended = true;
            warn!(daily_pnl = %self.state.daily_pnl, "daily loss limit hit, suspending");
            return GateDecision::deny(format!(
                "daily loss limit reached ({})",
                self.state.daily_pnl
            ));
        }

        let max_cost = balances.equity * self.config.max_position_pct / Decimal::ONE_HUNDRED;
        if position_cost > max_cost {
            return GateDecision::deny(format!(
                "position cost {position_cost} exceeds {}% of equity ({max_cost})",
                self.config.max_position_pct
            ));
        }

        if self.state.trades_today >= self.config.max_trades_per_day {
            return GateDecision::deny(format!(
                "daily trade cap reached ({})",
                self.state.trades_today
            ));
        }

        if self.state.consecutive_losses >= self.config.max_consecutive_losses {
            self.state.suspended = true;
            warn!(
                losses = self.state.consecutive_losses,
                "consecutive loss cap hit, suspending"
            );
            return GateDecision::deny(format!(
                "{} consecutive losses",
                self.state.consecutive_losses
            ));
        }

        if balances.is_margin_account {
            if balances.equity < PDT_EQUITY_MIN
                && self.day_trades_in_window(now) >= PDT_MAX_DAY_TRADES
            {
                return GateDecision::deny("pattern-day-trader limit (3 day trades / 5 days)");
            }
        } else if self.state.trades_today >= self.config.cash_account_max_trades {
            // Cash accounts settle T+1; the trade cap stands in for
            // unsettled-cash tracking.
            return GateDecision::deny(format!(
                "cash account trade cap reached ({})",
                self.state.trades_today
            ));
        }

        GateDecision::allow()
    }

    /// Fold a closed trade into the counters.
    pub fn record_trade(
        &mut self,
        entry_time: DateTime<Utc>,
        exit_time: DateTime<Utc>,
        pnl: Decimal,
    ) {
        self.state.daily_pnl += pnl;
        self.state.trades_today += 1;
        if pnl < Decimal::ZERO {
            self.state.consecutive_losses += 1;
        } else {
            self.state.consecutive_losses = 0;
        }
        if entry_time.date_naive() == exit_time.date_naive() {
            self.state.day_trades.push(exit_time);
        }
    }

    fn day_trades_in_window(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(PDT_WINDOW_DAYS);
        self.state
            .day_trades
            .iter()
            .filter(|&&t| t >= cutoff)
            .count()
    }
}
