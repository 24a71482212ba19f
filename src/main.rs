//! Momentum Scalping Bot
//!
//! Detects short-window momentum moves, buys the best-fitting 0DTE option
//! (or a gapping small-cap), and manages the position through partial
//! take-profit, trailing stop, and end-of-day exit.

mod api;
mod bot;
mod db;
mod errors;
mod models;
mod report;
mod trading;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::api::BrokerClient;
use crate::bot::{Bot, BotConfig};
use crate::db::Database;
use crate::report::SessionReport;
use crate::trading::EngineConfig;

/// Momentum scalping bot CLI.
#[derive(Parser)]
#[command(name = "scalper")]
#[command(about = "Scalp short-window momentum moves in options and gappers", long_about = None)]
struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "sqlite:./scalper.db?mode=rwc")]
    database: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start live trading (requires broker credentials in the environment)
    Run {
        /// Engine config file (JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Underlying to trade momentum options on
        #[arg(short, long)]
        underlying: Option<String>,

        /// Scanner watchlist (JSON); switches to gap-equity mode
        #[arg(short, long)]
        watchlist: Option<PathBuf>,
    },

    /// Start paper trading (real quotes, simulated fills)
    Paper {
        /// Engine config file (JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Underlying to trade momentum options on
        #[arg(short, long)]
        underlying: Option<String>,

        /// Scanner watchlist (JSON); switches to gap-equity mode
        #[arg(short, long)]
        watchlist: Option<PathBuf>,

        /// Starting equity for the simulated account
        #[arg(short, long, default_value = "10000")]
        equity: Decimal,
    },

    /// Show the effective engine configuration
    Config {
        /// Engine config file (JSON); defaults apply when omitted
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show recent trades and session statistics
    Report {
        /// Number of trades to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run {
            config,
            underlying,
            watchlist,
        } => {
            let engine = load_engine_config(config, underlying)?;
            let bot_config = BotConfig {
                engine,
                paper: false,
                paper_equity: Decimal::ZERO,
                database_url: cli.database.clone(),
                watchlist_path: watchlist,
            };

            run_bot(bot_config, "LIVE TRADING").await
        }

        Commands::Paper {
            config,
            underlying,
            watchlist,
            equity,
        } => {
            let engine = load_engine_config(config, underlying)?;
            let bot_config = BotConfig {
                engine,
                paper: true,
                paper_equity: equity,
                database_url: cli.database.clone(),
                watchlist_path: watchlist,
            };

            println!("\nThis is SIMULATED trading - no real money involved.");
            run_bot(bot_config, "PAPER (simulated fills)").await
        }

        Commands::Config { config } => {
            let engine = load_engine_config(config, None)?;

            println!("\n=== Engine Configuration ===\n");
            println!("Underlying:           {}", engine.underlying);
            println!("Poll Interval:        {}s", engine.poll_interval_secs);

            println!("\nSignal:");
            println!(
                "  Threshold:          {}{}",
                engine.signal.threshold,
                if engine.signal.threshold_is_percent { "%" } else { " pts" }
            );
            println!("  Window:             {}s", engine.signal.window_secs);

            println!("\nSelection:");
            println!("  Target Delta:       {}", engine.selector.target_delta);
            println!("  Min Premium:        ${}", engine.selector.min_premium);
            println!("  Max Spread:         {}", engine.selector.max_spread_pct);
            println!("  Min Volume:         {}", engine.selector.min_volume);
            println!("  Min Open Interest:  {}", engine.selector.min_open_interest);
            println!("  Gap Price Band:     ${} - ${}", engine.selector.min_price, engine.selector.max_price);
            println!("  Min Gap:            {}%", engine.selector.min_gap_pct);
            println!("  Min Relative Vol:   {}x", engine.selector.min_relative_volume);

            println!("\nRisk:");
            println!("  Max Daily Loss:     ${}", engine.risk.max_daily_loss);
            println!("  Max Position:       {}% of equity", engine.risk.max_position_pct);
            println!("  Max Trades/Day:     {}", engine.risk.max_trades_per_day);
            println!("  Max Consec Losses:  {}", engine.risk.max_consecutive_losses);
            println!("  Cash Acct Trades:   {}", engine.risk.cash_account_max_trades);

            println!("\nSizing:");
            println!("  Risk Per Trade:     {}% of equity", engine.sizer.risk_pct);
            println!("  Hard Risk Cap:      ${}", engine.sizer.hard_risk_cap);
            println!("  Cash Buffer:        ${}", engine.sizer.cash_buffer);

            println!("\nExecution:");
            println!("  Limit Offset:       ${}", engine.executor.limit_offset);
            println!("  Chase Increment:    ${}", engine.executor.chase_increment);
            println!("  Emergency Offset:   ${}", engine.executor.emergency_offset);
            println!("  Max Attempts:       {}", engine.executor.max_attempts);
            println!("  Order Timeout:      {}s", engine.executor.order_timeout_secs);

            println!("\nExits:");
            println!("  Stop Loss:          {}%", engine.exits.stop_loss_pct);
            println!("  Partial TP:         {}% gain, close {}", engine.exits.partial_tp_pct, engine.exits.partial_fraction);
            println!("  Trailing Arms At:   {}%", engine.exits.trailing_activation_pct);
            println!("  Trailing Distance:  {}%", engine.exits.trailing_distance_pct);
            println!("  Max Hold:           {} min", engine.exits.max_hold_minutes);

            println!("\nHours:");
            println!("  Session:            {} - {}", engine.hours.open, engine.hours.close);
            println!("  No Entries After:   {}", engine.hours.no_entries_after);
            println!("  EOD Exit:           {}", engine.hours.eod_exit);

            Ok(())
        }

        Commands::Report { limit } => {
            let db = Database::new(&cli.database).await?;
            let trades = db.recent_trades(limit).await?;

            if trades.is_empty() {
                println!("No trades recorded yet.");
                return Ok(());
            }

            println!(
                "\n{:<22} {:<6} {:>4} {:>9} {:>9} {:>10} {:>8}  {}",
                "SYMBOL", "SIDE", "QTY", "ENTRY", "EXIT", "P&L", "P&L%", "REASON"
            );
            println!("{}", "-".repeat(88));
            for t in &trades {
                println!(
                    "{:<22} {:<6} {:>4} {:>9.2} {:>9.2} {:>10.2} {:>7.1}%  {}",
                    t.symbol,
                    t.side,
                    t.quantity,
                    t.entry_price,
                    t.exit_price,
                    t.pnl_dollars,
                    t.pnl_percent,
                    t.exit_reason
                );
            }

            let report = SessionReport::from_trades(&trades);
            println!("\n{report}");
            Ok(())
        }
    }
}

fn load_engine_config(path: Option<PathBuf>, underlying: Option<String>) -> Result<EngineConfig> {
    let mut engine = match path {
        Some(p) => EngineConfig::from_file(&p)?,
        None => EngineConfig::default(),
    };
    if let Some(u) = underlying {
        engine.underlying = u;
    }
    Ok(engine)
}

async fn run_bot(config: BotConfig, mode: &str) -> Result<()> {
    let broker = Arc::new(BrokerClient::from_env()?);
    broker.authenticate().await?;

    println!("\n=== Momentum Scalping Bot ===");
    println!("Mode: {}", mode);
    match &config.watchlist_path {
        Some(path) => println!("Watchlist: {}", path.display()),
        None => println!("Underlying: {}", config.engine.underlying),
    }
    println!("Polling interval: {}s", config.engine.poll_interval_secs);
    println!("\nPress Ctrl+C to stop.\n");

    let mut bot = Bot::new(config, broker).await?;
    if let Err(e) = bot.run().await {
        tracing::error!(error = %e, "Bot error");
    }

    let stats = bot.stats();
    info!(
        ticks = stats.ticks,
        signals = stats.signals,
        entries = stats.entries,
        exits = stats.exits,
        "session counters"
    );
    Ok(())
}
