//! SQLite persistence.
//!
//! Two concerns: the append-only trade log (one row per full or partial
//! close, read back by the `report` command) and a risk-state snapshot so
//! a restart mid-session keeps the daily counters.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::models::TradeRecord;
use crate::trading::RiskState;

/// Database connection pool.
pub struct Database {
    pool: SqlitePool,
}

/// Trade row as stored. Prices go through f64 at the db boundary.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredTrade {
    pub id: i64,
    pub symbol: String,
    pub side: String,
    pub quantity: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: String,
    pub exit_time: String,
    pub signal_kind: String,
    pub exit_reason: String,
    pub pnl_dollars: f64,
    pub pnl_percent: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct StoredRiskState {
    daily_pnl: f64,
    trades_today: i64,
    consecutive_losses: i64,
    day_trades: String,
    last_reset: String,
    suspended: bool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                quantity INTEGER NOT NULL,
                entry_price REAL NOT NULL,
                exit_price REAL NOT NULL,
                entry_time TEXT NOT NULL,
                exit_time TEXT NOT NULL,
                signal_kind TEXT NOT NULL,
                exit_reason TEXT NOT NULL,
                pnl_dollars REAL NOT NULL,
                pnl_percent REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS risk_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                daily_pnl REAL NOT NULL DEFAULT 0,
                trades_today INTEGER NOT NULL DEFAULT 0,
                consecutive_losses INTEGER NOT NULL DEFAULT 0,
                day_trades TEXT NOT NULL DEFAULT '[]',
                last_reset TEXT NOT NULL,
                suspended INTEGER NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_trades_exit_time ON trades(exit_time)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ==================== Trades ====================

    /// Append one closed trade.
    pub async fn record_trade(&self, record: &TradeRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trades (
                symbol, side, quantity, entry_price, exit_price,
                entry_time, exit_time, signal_kind, exit_reason,
                pnl_dollars, pnl_percent
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.symbol)
        .bind(record.side.as_str())
        .bind(record.quantity as i64)
        .bind(record.entry_price.to_f64().unwrap_or(0.0))
        .bind(record.exit_price.to_f64().unwrap_or(0.0))
        .bind(record.entry_time.to_rfc3339())
        .bind(record.exit_time.to_rfc3339())
        .bind(record.signal_kind.as_str())
        .bind(record.exit_reason.as_str())
        .bind(record.pnl_dollars.to_f64().unwrap_or(0.0))
        .bind(record.pnl_percent.to_f64().unwrap_or(0.0))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Trades closed on one calendar date (UTC), oldest first.
    pub async fn trades_for_day(&self, date: NaiveDate) -> Result<Vec<StoredTrade>> {
        sqlx::query_as::<_, StoredTrade>(
            "SELECT * FROM trades WHERE exit_time LIKE ? || '%' ORDER BY exit_time",
        )
        .bind(date.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch trades")
    }

    /// Most recent trades, oldest first.
    pub async fn recent_trades(&self, limit: i64) -> Result<Vec<StoredTrade>> {
        let mut rows = sqlx::query_as::<_, StoredTrade>(
            "SELECT * FROM trades ORDER BY exit_time DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch trades")?;
        rows.reverse();
        Ok(rows)
    }

    // ==================== Risk state ====================

    /// Upsert the daily risk snapshot.
    pub async fn save_risk_state(&self, state: &RiskState) -> Result<()> {
        let day_trades = serde_json::to_string(&state.day_trades)?;

        sqlx::query(
            r#"
            INSERT INTO risk_state (
                id, daily_pnl, trades_today, consecutive_losses,
                day_trades, last_reset, suspended, updated_at
            ) VALUES (1, ?, ?, ?, ?, ?, ?, datetime('now'))
            ON CONFLICT(id) DO UPDATE SET
                daily_pnl = excluded.daily_pnl,
                trades_today = excluded.trades_today,
                consecutive_losses = excluded.consecutive_losses,
                day_trades = excluded.day_trades,
                last_reset = excluded.last_reset,
                suspended = excluded.suspended,
                updated_at = datetime('now')
            "#,
        )
        .bind(state.daily_pnl.to_f64().unwrap_or(0.0))
        .bind(state.trades_today as i64)
        .bind(state.consecutive_losses as i64)
        .bind(day_trades)
        .bind(state.last_reset.to_string())
        .bind(state.suspended)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Load the last snapshot, if any.
    pub async fn load_risk_state(&self) -> Result<Option<RiskState>> {
        let row = sqlx::query_as::<_, StoredRiskState>("SELECT * FROM risk_state WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let day_trades: Vec<DateTime<Utc>> =
            serde_json::from_str(&row.day_trades).unwrap_or_default();
        let last_reset = row
            .last_reset
            .parse::<NaiveDate>()
            .context("corrupt last_reset in risk snapshot")?;

        Ok(Some(RiskState {
            daily_pnl: Decimal::from_f64(row.daily_pnl).unwrap_or_default(),
            trades_today: row.trades_today as u32,
            consecutive_losses: row.consecutive_losses as u32,
            day_trades,
            last_reset,
            suspended: row.suspended,
        }))
    }
}
