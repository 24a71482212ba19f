//! Closed-trade record and the enums that describe it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::position::{Position, Side};

/// Which entry logic produced the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    MomentumUp,
    MomentumDown,
    GapScan,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::MomentumUp => "momentum_up",
            SignalKind::MomentumDown => "momentum_down",
            SignalKind::GapScan => "gap_scan",
        }
    }
}

/// Why a position (or part of one) was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    TrailingStop,
    TimeLimit,
    EndOfDay,
    Shutdown,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::StopLoss => "stop_loss",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::TrailingStop => "trailing_stop",
            ExitReason::TimeLimit => "time_limit",
            ExitReason::EndOfDay => "end_of_day",
            ExitReason::Shutdown => "shutdown",
        }
    }
}

/// Append-only record of one full or partial close.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub side: Side,
    pub quantity: u32,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub signal_kind: SignalKind,
    pub exit_reason: ExitReason,
    pub pnl_dollars: Decimal,
    pub pnl_percent: Decimal,
}

impl TradeRecord {
    /// Record a close of `quantity` units of `position` at `exit_price`.
    pub fn from_close(
        position: &Position,
        quantity: u32,
        exit_price: Decimal,
        exit_time: DateTime<Utc>,
        exit_reason: ExitReason,
    ) -> Self {
        Self {
            symbol: position.instrument.id.clone(),
            side: position.side,
            quantity,
            entry_price: position.entry_price,
            exit_price,
            entry_time: position.entry_time,
            exit_time,
            signal_kind: position.signal_kind,
            exit_reason,
            pnl_dollars: position.pnl_dollars(exit_price, quantity),
            pnl_percent: position.gain_pct(exit_price),
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl_dollars > Decimal::ZERO
    }
}
