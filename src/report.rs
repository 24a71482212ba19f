//! Session summary computed from the stored trade log.

use statrs::statistics::Statistics;
use std::fmt;

use crate::db::StoredTrade;

/// Aggregate statistics over a set of closed trades.
#[derive(Debug, Clone, Default)]
pub struct SessionReport {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    pub profit_factor: f64,
    /// Std-dev of per-trade percent returns
    pub return_std_dev: f64,
}

impl SessionReport {
    pub fn from_trades(trades: &[StoredTrade]) -> Self {
        if trades.is_empty() {
            return Self::default();
        }

        let pnls: Vec<f64> = trades.iter().map(|t| t.pnl_dollars).collect();
        let (wins, losses): (Vec<f64>, Vec<f64>) = pnls.iter().partition(|&&p| p > 0.0);

        let gross_profit: f64 = wins.iter().sum();
        let gross_loss: f64 = losses.iter().map(|l| l.abs()).sum();

        let returns: Vec<f64> = trades.iter().map(|t| t.pnl_percent).collect();
        let return_std_dev = if returns.len() > 1 {
            returns.std_dev()
        } else {
            0.0
        };

        Self {
            trades: trades.len(),
            wins: wins.len(),
            losses: losses.len(),
            win_rate: wins.len() as f64 / trades.len() as f64,
            total_pnl: pnls.iter().sum(),
            avg_win: if wins.is_empty() {
                0.0
            } else {
                gross_profit / wins.len() as f64
            },
            avg_loss: if losses.is_empty() {
                0.0
            } else {
                gross_loss / losses.len() as f64
            },
            largest_win: pnls.iter().copied().fold(0.0, f64::max),
            largest_loss: pnls.iter().copied().fold(0.0, f64::min),
            profit_factor: if gross_loss > 0.0 {
                gross_profit / gross_loss
            } else {
                0.0
            },
            return_std_dev,
        }
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Session Report")?;
        writeln!(f, "==============")?;
        writeln!(f, "Trades:        {}", self.trades)?;
        writeln!(
            f,
            "Win rate:      {:.1}% ({}/{} wins)",
            self.win_rate * 100.0,
            self.wins,
            self.trades
        )?;
        writeln!(f, "Total P&L:     ${:.2}", self.total_pnl)?;
        writeln!(f, "Avg win:       ${:.2}", self.avg_win)?;
        writeln!(f, "Avg loss:      ${:.2}", self.avg_loss)?;
        writeln!(f, "Largest win:   ${:.2}", self.largest_win)?;
        writeln!(f, "Largest loss:  ${:.2}", self.largest_loss)?;
        writeln!(f, "Profit factor: {:.2}", self.profit_factor)?;
        write!(f, "Return stdev:  {:.2}%", self.return_std_dev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trade(pnl: f64, pct: f64) -> StoredTrade {
        StoredTrade {
            id: 0,
            symbol: "SPY   250825C00470000".to_string(),
            side: "LONG".to_string(),
            quantity: 1,
            entry_price: 2.00,
            exit_price: 2.00 + pnl / 100.0,
            entry_time: "2025-08-25T14:00:00Z".to_string(),
            exit_time: "2025-08-25T14:30:00Z".to_string(),
            signal_kind: "momentum_up".to_string(),
            exit_reason: "take_profit".to_string(),
            pnl_dollars: pnl,
            pnl_percent: pct,
        }
    }

    #[test]
    fn test_report_math() {
        let trades = vec![
            trade(100.0, 50.0),
            trade(60.0, 30.0),
            trade(-40.0, -20.0),
            trade(-40.0, -20.0),
        ];
        let report = SessionReport::from_trades(&trades);

        assert_eq!(report.trades, 4);
        assert_eq!(report.wins, 2);
        assert_eq!(report.losses, 2);
        assert!((report.win_rate - 0.5).abs() < f64::EPSILON);
        assert!((report.total_pnl - 80.0).abs() < f64::EPSILON);
        assert!((report.avg_win - 80.0).abs() < f64::EPSILON);
        assert!((report.avg_loss - 40.0).abs() < f64::EPSILON);
        assert!((report.profit_factor - 2.0).abs() < f64::EPSILON);
        assert!((report.largest_win - 100.0).abs() < f64::EPSILON);
        assert!((report.largest_loss + 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_report() {
        let report = SessionReport::from_trades(&[]);
        assert_eq!(report.trades, 0);
        assert_eq!(report.win_rate, 0.0);
        assert_eq!(report.profit_factor, 0.0);
    }
}
