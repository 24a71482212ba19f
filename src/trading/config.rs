//! Engine configuration.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Top-level engine configuration, one section per component.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Underlying to scalp options on (momentum mode)
    pub underlying: String,

    /// Seconds between loop ticks
    pub poll_interval_secs: u64,

    pub signal: SignalConfig,
    pub selector: SelectorConfig,
    pub risk: RiskConfig,
    pub sizer: SizerConfig,
    pub executor: ExecutorConfig,
    pub exits: ExitConfig,
    pub hours: HoursConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            underlying: "SPY".to_string(),
            poll_interval_secs: 5,
            signal: SignalConfig::default(),
            selector: SelectorConfig::default(),
            risk: RiskConfig::default(),
            sizer: SizerConfig::default(),
            executor: ExecutorConfig::default(),
            exits: ExitConfig::default(),
            hours: HoursConfig::default(),
        }
    }
}

/// Momentum signal detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Move required to fire, dollars (absolute mode) or percent
    pub threshold: Decimal,

    /// Interpret `threshold` as percent of the reference price
    pub threshold_is_percent: bool,

    /// Seconds the move must happen within
    pub window_secs: i64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            threshold: dec!(1.50),      // $1.50 move on the underlying
            threshold_is_percent: false,
            window_secs: 120,
        }
    }
}

/// Candidate filters and scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Target |delta| for option selection
    pub target_delta: Decimal,

    /// Minimum mid premium, dollars per contract point
    pub min_premium: Decimal,

    /// Maximum spread as a fraction of mid
    pub max_spread_pct: Decimal,

    pub min_volume: u64,
    pub min_open_interest: u64,

    /// Gap-selector price band
    pub min_price: Decimal,
    pub max_price: Decimal,

    /// Minimum gap percent to consider
    pub min_gap_pct: Decimal,

    /// Minimum relative volume when an average is known
    pub min_relative_volume: Decimal,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            target_delta: dec!(0.45),
            min_premium: dec!(0.30),
            max_spread_pct: dec!(0.15),
            min_volume: 100,
            min_open_interest: 500,
            min_price: dec!(2.00),
            max_price: dec!(30.00),
            min_gap_pct: dec!(10),
            min_relative_volume: dec!(2),
        }
    }
}

/// Account-level guardrails.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Daily realized loss that suspends trading, dollars
    pub max_daily_loss: Decimal,

    /// Max position cost as percent of account equity
    pub max_position_pct: Decimal,

    pub max_trades_per_day: u32,
    pub max_consecutive_losses: u32,

    /// Day-trade cap for cash accounts (unsettled-cash proxy)
    pub cash_account_max_trades: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_daily_loss: dec!(500),
            max_position_pct: dec!(50),
            max_trades_per_day: 6,
            max_consecutive_losses: 3,
            cash_account_max_trades: 3,
        }
    }
}

/// Position sizing inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SizerConfig {
    /// Percent of equity risked per trade
    pub risk_pct: Decimal,

    /// Hard dollar cap on per-trade risk
    pub hard_risk_cap: Decimal,

    /// Cash kept free of any position
    pub cash_buffer: Decimal,
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self {
            risk_pct: dec!(3),
            hard_risk_cap: dec!(150),
            cash_buffer: dec!(100),
        }
    }
}

/// Chase-loop order execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Initial limit offset beyond the touch
    pub limit_offset: Decimal,

    /// Re-price step per chase attempt
    pub chase_increment: Decimal,

    /// Extra cross beyond the touch for the emergency exit
    pub emergency_offset: Decimal,

    pub max_attempts: u32,
    pub order_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            limit_offset: dec!(0.05),
            chase_increment: dec!(0.05),
            emergency_offset: dec!(0.10),
            max_attempts: 3,
            order_timeout_secs: 15,
            poll_interval_ms: 1_000,
        }
    }
}

/// Exit ladder thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitConfig {
    /// Stop distance from entry, percent
    pub stop_loss_pct: Decimal,

    /// Gain that triggers the partial take-profit, percent
    pub partial_tp_pct: Decimal,

    /// Fraction of the position closed at the partial (0..1)
    pub partial_fraction: Decimal,

    /// Gain that arms the trailing stop, percent
    pub trailing_activation_pct: Decimal,

    /// Trail distance below the high-water mark, percent
    pub trailing_distance_pct: Decimal,

    pub max_hold_minutes: i64,
}

impl Default for ExitConfig {
    fn default() -> Self {
        Self {
            stop_loss_pct: dec!(25),
            partial_tp_pct: dec!(50),
            partial_fraction: dec!(0.5),
            trailing_activation_pct: dec!(30),
            trailing_distance_pct: dec!(15),
            max_hold_minutes: 45,
        }
    }
}

/// Session clock (exchange local time).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HoursConfig {
    pub open: String,
    pub close: String,
    pub no_entries_after: String,
    pub eod_exit: String,
}

impl Default for HoursConfig {
    fn default() -> Self {
        Self {
            open: "09:30".to_string(),
            close: "16:00".to_string(),
            no_entries_after: "11:30".to_string(),
            eod_exit: "15:50".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file, falling back to defaults per missing field.
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_file_keeps_defaults() {
        let raw = r#"{
            "underlying": "QQQ",
            "signal": { "threshold": "2.00" }
        }"#;
        let config: EngineConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.underlying, "QQQ");
        assert_eq!(config.signal.threshold, rust_decimal_macros::dec!(2.00));
        // untouched sections keep their defaults
        assert_eq!(config.signal.window_secs, 120);
        assert_eq!(config.executor.max_attempts, 3);
        assert_eq!(config.hours.eod_exit, "15:50");
    }
}
