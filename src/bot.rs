//! Engine runner: the main tick loop.
//!
//! Each tick either looks for an entry (flat) or manages the open position.
//! Errors inside a tick are caught at the loop boundary so a bad quote or a
//! dropped connection never kills the session.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Local, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::api::types::{Balances, OrderSide, OrderStatus, OrderView};
use crate::api::{AccountInfoProvider, OrderGateway, QuoteSource};
use crate::db::Database;
use crate::errors::BrokerError;
use crate::models::{
    load_watchlist, Candidate, ExitReason, Instrument, Position, PositionState, Side, SignalKind,
    TradeRecord,
};
use crate::report::SessionReport;
use crate::trading::{
    Alert, CandidateSelector, Direction, EngineConfig, ExitDecision, ExitOutcome,
    LifecycleManager, OrderExecutor, PositionSizer, RiskGate, RiskState, SignalDetector,
    TradingHours,
};

/// Runner configuration on top of the engine config.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub engine: EngineConfig,

    /// Simulate fills instead of routing orders
    pub paper: bool,

    /// Starting equity for paper sessions
    pub paper_equity: Decimal,

    pub database_url: String,

    /// Scanner watchlist (JSON). Present = gap-equity mode,
    /// absent = momentum-options mode on `engine.underlying`.
    pub watchlist_path: Option<PathBuf>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            paper: true,
            paper_equity: dec!(10000),
            database_url: "sqlite:scalper.db?mode=rwc".to_string(),
            watchlist_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TradeMode {
    MomentumOptions,
    GapEquities,
}

/// Running session counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionStats {
    pub ticks: u64,
    pub signals: u64,
    pub entries: u64,
    pub exits: u64,
    pub blocked_by_risk: u64,
}

pub struct Bot {
    config: BotConfig,
    mode: TradeMode,
    quotes: Arc<dyn QuoteSource>,
    gateway: Arc<dyn OrderGateway>,
    account: Arc<dyn AccountInfoProvider>,
    paper_account: Option<Arc<PaperAccount>>,
    db: Database,
    hours: TradingHours,
    detector: SignalDetector,
    selector: CandidateSelector,
    sizer: PositionSizer,
    risk: RiskGate,
    lifecycle: LifecycleManager,
    alert_tx: mpsc::Sender<Alert>,
    watchlist: Vec<Candidate>,
    position: Option<Position>,
    stats: SessionStats,
    shutdown: Arc<AtomicBool>,
}

impl Bot {
    /// Wire the engine together. In paper mode the order gateway and
    /// account are simulated; quotes always come from the real source.
    pub async fn new(config: BotConfig, broker: Arc<crate::api::BrokerClient>) -> Result<Self> {
        let quotes: Arc<dyn QuoteSource> = broker.clone();

        let (gateway, account, paper_account): (
            Arc<dyn OrderGateway>,
            Arc<dyn AccountInfoProvider>,
            Option<Arc<PaperAccount>>,
        ) = if config.paper {
            let paper = Arc::new(PaperAccount::new(config.paper_equity));
            (
                Arc::new(PaperGateway::default()),
                paper.clone(),
                Some(paper),
            )
        } else {
            (broker.clone(), broker, None)
        };

        Self::with_seams(config, quotes, gateway, account, paper_account).await
    }

    async fn with_seams(
        config: BotConfig,
        quotes: Arc<dyn QuoteSource>,
        gateway: Arc<dyn OrderGateway>,
        account: Arc<dyn AccountInfoProvider>,
        paper_account: Option<Arc<PaperAccount>>,
    ) -> Result<Self> {
        let db = Database::new(&config.database_url).await?;
        let hours = TradingHours::from_config(&config.engine.hours)?;

        let watchlist = match &config.watchlist_path {
            Some(path) => load_watchlist(path)?,
            None => Vec::new(),
        };
        let mode = if watchlist.is_empty() {
            TradeMode::MomentumOptions
        } else {
            TradeMode::GapEquities
        };
        if mode == TradeMode::GapEquities && !config.engine.signal.threshold_is_percent {
            anyhow::bail!(
                "watchlist symbols span different price ranges; set \
                 signal.threshold_is_percent so one threshold fits all of them"
            );
        }

        // Resume the daily counters if a snapshot exists; the first touch
        // of a new date resets them anyway.
        let today = Utc::now().date_naive();
        let risk_state = db
            .load_risk_state()
            .await?
            .unwrap_or_else(|| RiskState::new(today));
        let risk = RiskGate::new(config.engine.risk.clone(), risk_state);

        let (lifecycle, alert_tx) = LifecycleManager::new(config.engine.exits.clone());

        Ok(Self {
            mode,
            detector: SignalDetector::new(config.engine.signal.clone()),
            selector: CandidateSelector::new(config.engine.selector.clone()),
            sizer: PositionSizer::new(
                config.engine.sizer.clone(),
                config.engine.risk.max_position_pct,
            ),
            risk,
            lifecycle,
            alert_tx,
            quotes,
            gateway,
            account,
            paper_account,
            db,
            hours,
            watchlist,
            position: None,
            stats: SessionStats::default(),
            shutdown: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    pub fn shutdown_signal(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Sender half of the alert queue, handed to the webhook listener.
    pub fn alert_sender(&self) -> mpsc::Sender<Alert> {
        self.alert_tx.clone()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Main loop. Runs until ctrl-c or the shutdown flag flips, then
    /// force-closes any open position and prints the session report.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            mode = ?self.mode,
            paper = self.config.paper,
            poll_interval = self.config.engine.poll_interval_secs,
            "starting engine loop"
        );

        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("shutdown signal received");
            shutdown.store(true, Ordering::SeqCst);
        });

        let mut ticker = interval(Duration::from_secs(self.config.engine.poll_interval_secs));

        while !self.shutdown.load(Ordering::SeqCst) {
            ticker.tick().await;

            if let Err(e) = self.tick().await {
                error!(error = %e, "tick failed");
                // brief pause so a flapping broker does not spin the loop
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }

        self.finish().await
    }

    /// One loop iteration.
    async fn tick(&mut self) -> Result<()> {
        self.stats.ticks += 1;
        self.risk.touch(Utc::now().date_naive());

        let now_local = Local::now().naive_local();
        if !self.hours.is_open(now_local) {
            if self.position.is_some() {
                // Session closed underneath an open position (late fill,
                // clock skew): flatten immediately.
                warn!("market closed with open position, forcing exit");
                self.close_position(ExitReason::EndOfDay).await?;
            }
            return Ok(());
        }

        if self.position.is_some() {
            self.manage_position().await
        } else if self.hours.entries_allowed(now_local) {
            match self.mode {
                TradeMode::MomentumOptions => self.seek_option_entry().await,
                TradeMode::GapEquities => self.seek_gap_entry().await,
            }
        } else {
            Ok(())
        }
    }

    // ==================== Entries ====================

    async fn seek_option_entry(&mut self) -> Result<()> {
        let underlying = self.config.engine.underlying.clone();
        let quote = self.quotes.quote(&underlying).await?;

        let Some(signal) = self.detector.on_quote(&quote, true) else {
            return Ok(());
        };
        self.stats.signals += 1;

        let chain = self.quotes.instrument_chain(&underlying).await?;
        let selection = self.selector.select_option(&chain, signal.direction);
        let Some(instrument) = selection.chosen else {
            info!(
                rejected = selection.rejections.total(),
                rejections = ?selection.rejections,
                "signal fired but no contract qualified"
            );
            return Ok(());
        };

        let kind = match signal.direction {
            Direction::Up => SignalKind::MomentumUp,
            Direction::Down => SignalKind::MomentumDown,
        };
        self.try_enter(instrument, kind).await
    }

    async fn seek_gap_entry(&mut self) -> Result<()> {
        let symbols: Vec<String> = self.watchlist.iter().map(|c| c.symbol.clone()).collect();
        let quotes = self.quotes.quotes(&symbols).await?;

        // Momentum confirmation: only symbols that moved this tick are
        // eligible for selection.
        let mut fired: Vec<String> = Vec::new();
        for quote in quotes.values() {
            if let Some(signal) = self.detector.on_quote(quote, true) {
                if signal.direction == Direction::Up {
                    fired.push(signal.symbol);
                }
            }
        }
        if fired.is_empty() {
            return Ok(());
        }
        self.stats.signals += fired.len() as u64;

        // Re-price the fired candidates from the live quotes before scoring.
        let eligible: Vec<Candidate> = self
            .watchlist
            .iter()
            .filter(|c| fired.contains(&c.symbol))
            .map(|c| {
                let mut c = c.clone();
                if let Some(q) = quotes.get(&c.symbol) {
                    c.price = q.mid();
                    c.volume = q.volume;
                }
                c
            })
            .collect();

        let selection = self.selector.select_gap(&eligible);
        let Some(candidate) = selection.chosen else {
            debug!(rejections = ?selection.rejections, "no gap candidate qualified");
            return Ok(());
        };

        let Some(quote) = quotes.get(&candidate.symbol) else {
            return Ok(());
        };
        let instrument =
            Instrument::share(&candidate.symbol, quote.bid, quote.ask, quote.last, quote.volume);
        self.try_enter(instrument, SignalKind::GapScan).await
    }

    /// Size, risk-check, and execute an entry for the chosen instrument.
    async fn try_enter(&mut self, instrument: Instrument, kind: SignalKind) -> Result<()> {
        let balances = self.account.balances().await?;
        let exits = &self.config.engine.exits;

        // Size against the worst case: paying the ask with the stop at its
        // configured distance below.
        let entry_est = instrument.ask;
        let stop_est = entry_est * (Decimal::ONE - exits.stop_loss_pct / Decimal::ONE_HUNDRED);
        let unit_cost = instrument.unit_cost(entry_est);

        let quantity = self.sizer.size(entry_est, stop_est, unit_cost, &balances);
        if quantity == 0 {
            info!(instrument = %instrument.id, "sizer returned zero, skipping entry");
            return Ok(());
        }

        let cost = unit_cost * Decimal::from(quantity);
        let decision = self.risk.can_trade(cost, &balances, Utc::now());
        if !decision.allowed {
            self.stats.blocked_by_risk += 1;
            info!(
                reason = decision.reason.as_deref().unwrap_or(""),
                "entry blocked by risk gate"
            );
            self.db.save_risk_state(self.risk.state()).await?;
            return Ok(());
        }

        let executor = OrderExecutor::new(
            self.gateway.as_ref(),
            self.quotes.as_ref(),
            self.config.engine.executor.clone(),
        );
        let Some(fill) = executor.execute_entry(&instrument.id, quantity).await? else {
            return Ok(());
        };

        if let Some(paper) = &self.paper_account {
            paper
                .debit(instrument.unit_cost(fill.price) * Decimal::from(quantity))
                .await;
        }

        let stop = fill.price * (Decimal::ONE - exits.stop_loss_pct / Decimal::ONE_HUNDRED);
        let target = fill.price * (Decimal::ONE + exits.partial_tp_pct / Decimal::ONE_HUNDRED);
        let symbol = instrument.underlying.clone();
        let position = Position::new(instrument, Side::Long, quantity, fill.price, stop, target, kind);

        info!(
            id = %position.id,
            instrument = %position.instrument.id,
            quantity,
            entry = %fill.price,
            %stop,
            %target,
            attempts = fill.attempts,
            "position opened"
        );
        self.stats.entries += 1;
        self.position = Some(position);
        self.detector.reset(&symbol);
        Ok(())
    }

    // ==================== Position management ====================

    async fn manage_position(&mut self) -> Result<()> {
        let Some(position) = &mut self.position else {
            return Ok(());
        };

        let refreshed = match self.quotes.instrument_quote(&position.instrument.id).await {
            Ok(i) => i,
            Err(e) if e.is_transient() => {
                debug!(error = %e, "quote refresh failed, skipping tick");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        // A refresh with no bid, ask, or last gives nothing to mark the
        // position against; treat it like a failed fetch rather than a
        // price of zero.
        let Some(price) = refreshed.mark() else {
            debug!(
                instrument = %position.instrument.id,
                "empty quote refresh, skipping tick"
            );
            return Ok(());
        };
        position.instrument.bid = refreshed.bid;
        position.instrument.ask = refreshed.ask;
        position.instrument.last = refreshed.last;

        let past_eod = self.hours.past_eod_exit(Local::now().naive_local());
        let decision = self.lifecycle.evaluate(position, price, Utc::now(), past_eod);

        match decision {
            ExitDecision::Hold => Ok(()),
            ExitDecision::Partial { quantity } => self.close_quantity(quantity, ExitReason::TakeProfit).await,
            ExitDecision::Close { reason } => self.close_position(reason).await,
        }
    }

    /// Close part of the position; the remainder keeps running.
    async fn close_quantity(&mut self, quantity: u32, reason: ExitReason) -> Result<()> {
        let Some(position) = &mut self.position else {
            return Ok(());
        };

        let executor = OrderExecutor::new(
            self.gateway.as_ref(),
            self.quotes.as_ref(),
            self.config.engine.executor.clone(),
        );
        let exit_price = match executor.execute_exit(&position.instrument.id, quantity).await? {
            ExitOutcome::Filled(fill) => fill.price,
            // Fire-and-forget: book the close at the crossing price.
            ExitOutcome::EmergencySubmitted { .. } => position.instrument.bid,
        };

        let record =
            TradeRecord::from_close(position, quantity, exit_price, Utc::now(), reason);
        let proceeds = exit_price * Decimal::from(quantity) * position.instrument.multiplier;
        position.quantity -= quantity;
        position.state = PositionState::PartiallyClosed;
        info!(
            id = %position.id,
            quantity,
            %exit_price,
            remaining = position.quantity,
            pnl = %record.pnl_dollars,
            "partial close"
        );

        self.settle(record, proceeds).await
    }

    /// Close the full remaining quantity and discard the position.
    async fn close_position(&mut self, reason: ExitReason) -> Result<()> {
        let Some(mut position) = self.position.take() else {
            return Ok(());
        };
        position.state = PositionState::Exiting;

        let executor = OrderExecutor::new(
            self.gateway.as_ref(),
            self.quotes.as_ref(),
            self.config.engine.executor.clone(),
        );
        let exit_price = match executor
            .execute_exit(&position.instrument.id, position.quantity)
            .await?
        {
            ExitOutcome::Filled(fill) => fill.price,
            ExitOutcome::EmergencySubmitted { .. } => position.instrument.bid,
        };

        let record = TradeRecord::from_close(
            &position,
            position.quantity,
            exit_price,
            Utc::now(),
            reason,
        );
        let proceeds =
            exit_price * Decimal::from(position.quantity) * position.instrument.multiplier;
        info!(
            id = %position.id,
            reason = reason.as_str(),
            %exit_price,
            pnl = %record.pnl_dollars,
            "position closed"
        );
        self.stats.exits += 1;

        self.settle(record, proceeds).await
    }

    /// Persist a close and fold it into the risk counters.
    async fn settle(&mut self, record: TradeRecord, proceeds: Decimal) -> Result<()> {
        if let Some(paper) = &self.paper_account {
            // Sale proceeds are credited immediately in paper mode; real
            // cash accounts settle T+1.
            paper.credit(proceeds, record.pnl_dollars).await;
        }

        self.risk
            .record_trade(record.entry_time, record.exit_time, record.pnl_dollars);
        self.db.record_trade(&record).await?;
        self.db.save_risk_state(self.risk.state()).await?;
        Ok(())
    }

    /// Forced flat on shutdown, then the session report.
    async fn finish(&mut self) -> Result<()> {
        if self.position.is_some() {
            warn!("open position at shutdown, forcing exit");
            self.close_position(ExitReason::Shutdown).await?;
        }

        let trades = self.db.trades_for_day(Utc::now().date_naive()).await?;
        let report = SessionReport::from_trades(&trades);
        info!(
            ticks = self.stats.ticks,
            signals = self.stats.signals,
            entries = self.stats.entries,
            blocked = self.stats.blocked_by_risk,
            "session finished"
        );
        println!("{report}");
        Ok(())
    }
}

// ==================== Paper trading seams ====================

/// Instantly-filling order gateway for paper sessions.
#[derive(Default)]
struct PaperGateway {
    counter: AtomicU64,
}

#[async_trait]
impl OrderGateway for PaperGateway {
    async fn place_limit(
        &self,
        instrument_id: &str,
        side: OrderSide,
        quantity: u32,
        limit_price: Decimal,
    ) -> Result<String, BrokerError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(instrument_id, ?side, quantity, %limit_price, "paper fill");
        Ok(format!("paper-{n}"))
    }

    async fn order_status(&self, _order_id: &str) -> Result<OrderView, BrokerError> {
        // Paper fills book at the submitted limit.
        Ok(OrderView {
            status: OrderStatus::Filled,
            fill_price: None,
        })
    }

    async fn cancel(&self, _order_id: &str) -> Result<bool, BrokerError> {
        Ok(false)
    }
}

/// Simulated account: cash moves on fills, equity tracks realized P&L.
struct PaperAccount {
    state: RwLock<Balances>,
}

impl PaperAccount {
    fn new(equity: Decimal) -> Self {
        Self {
            state: RwLock::new(Balances {
                equity,
                available_cash: equity,
                is_margin_account: false,
            }),
        }
    }

    async fn debit(&self, cost: Decimal) {
        let mut state = self.state.write().await;
        state.available_cash -= cost;
    }

    async fn credit(&self, proceeds: Decimal, pnl: Decimal) {
        let mut state = self.state.write().await;
        state.available_cash += proceeds;
        state.equity += pnl;
    }
}

#[async_trait]
impl AccountInfoProvider for PaperAccount {
    async fn balances(&self) -> Result<Balances, BrokerError> {
        Ok(self.state.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InstrumentKind, Quote};
    use std::collections::HashMap;

    /// Quote source that answers every instrument refresh with one
    /// canned snapshot.
    struct FixedQuotes {
        instrument: Instrument,
    }

    #[async_trait]
    impl QuoteSource for FixedQuotes {
        async fn quote(&self, symbol: &str) -> Result<Quote, BrokerError> {
            Err(BrokerError::QuoteUnavailable(symbol.to_string()))
        }

        async fn quotes(
            &self,
            _symbols: &[String],
        ) -> Result<HashMap<String, Quote>, BrokerError> {
            Ok(HashMap::new())
        }

        async fn instrument_chain(
            &self,
            _underlying: &str,
        ) -> Result<Vec<Instrument>, BrokerError> {
            Ok(Vec::new())
        }

        async fn instrument_quote(&self, _id: &str) -> Result<Instrument, BrokerError> {
            Ok(self.instrument.clone())
        }
    }

    fn contract(bid: Decimal, ask: Decimal, last: Decimal) -> Instrument {
        Instrument {
            id: "SPY   250825C00470000".to_string(),
            underlying: "SPY".to_string(),
            kind: InstrumentKind::Call,
            bid,
            ask,
            last,
            metric: dec!(0.45),
            volume: 500,
            open_interest: 2_000,
            multiplier: dec!(100),
        }
    }

    async fn paper_bot(config: BotConfig, refresh: Instrument) -> Result<Bot> {
        let quotes: Arc<dyn QuoteSource> = Arc::new(FixedQuotes { instrument: refresh });
        let paper = Arc::new(PaperAccount::new(dec!(10000)));
        Bot::with_seams(
            config,
            quotes,
            Arc::new(PaperGateway::default()),
            paper.clone(),
            Some(paper),
        )
        .await
    }

    #[tokio::test]
    async fn test_empty_quote_refresh_holds_position() {
        let config = BotConfig {
            database_url: "sqlite::memory:".to_string(),
            ..Default::default()
        };
        // refresh comes back with no bid, ask, or last
        let mut bot = paper_bot(config, contract(dec!(0), dec!(0), dec!(0)))
            .await
            .unwrap();

        let held = contract(dec!(1.95), dec!(2.05), dec!(2.00));
        bot.position = Some(Position::new(
            held,
            Side::Long,
            2,
            dec!(2.00),
            dec!(1.50),
            dec!(3.00),
            SignalKind::MomentumUp,
        ));

        bot.manage_position().await.unwrap();

        // A blank book is not a stop breach: the position rides untouched,
        // no exit order was routed, and the stale prices were not clobbered.
        let position = bot.position.as_ref().unwrap();
        assert_eq!(position.state, PositionState::Open);
        assert_eq!(position.quantity, 2);
        assert_eq!(position.instrument.bid, dec!(1.95));
        assert_eq!(bot.stats.exits, 0);
    }

    #[tokio::test]
    async fn test_empty_book_refresh_marks_at_last() {
        let mut config = BotConfig {
            database_url: "sqlite::memory:".to_string(),
            ..Default::default()
        };
        // keep the forced-flat cutoff out of the way of the wall clock
        config.engine.hours = crate::trading::HoursConfig {
            open: "00:00".to_string(),
            close: "23:59".to_string(),
            no_entries_after: "23:59".to_string(),
            eod_exit: "23:59".to_string(),
        };
        // no book, but a last print well above the stop
        let mut bot = paper_bot(config, contract(dec!(0), dec!(0), dec!(2.02)))
            .await
            .unwrap();

        bot.position = Some(Position::new(
            contract(dec!(1.95), dec!(2.05), dec!(2.00)),
            Side::Long,
            2,
            dec!(2.00),
            dec!(1.50),
            dec!(3.00),
            SignalKind::MomentumUp,
        ));

        bot.manage_position().await.unwrap();
        assert!(bot.position.is_some());
        assert_eq!(bot.stats.exits, 0);
    }

    #[tokio::test]
    async fn test_watchlist_mode_requires_percent_threshold() {
        let path = std::env::temp_dir().join("scalper-test-watchlist.json");
        std::fs::write(
            &path,
            r#"[{"symbol": "ABCD", "price": "7.50", "prev_close": "6.00",
                 "gap_pct": "25.0", "volume": 4000000}]"#,
        )
        .unwrap();

        let mut config = BotConfig {
            database_url: "sqlite::memory:".to_string(),
            watchlist_path: Some(path.clone()),
            ..Default::default()
        };

        // default threshold is absolute dollars: refused at startup
        let err = match paper_bot(config.clone(), contract(dec!(7.45), dec!(7.55), dec!(7.50)))
            .await
        {
            Ok(_) => panic!("absolute threshold must be rejected in watchlist mode"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("threshold_is_percent"));

        // percent mode wires up
        config.engine.signal.threshold_is_percent = true;
        config.engine.signal.threshold = dec!(2);
        let bot = paper_bot(config, contract(dec!(7.45), dec!(7.55), dec!(7.50)))
            .await
            .unwrap();
        assert_eq!(bot.mode, TradeMode::GapEquities);

        std::fs::remove_file(&path).ok();
    }

    #[tokio::test]
    async fn test_paper_gateway_fills_instantly() {
        let gateway = PaperGateway::default();
        let id = gateway
            .place_limit("SPY   250825C00470000", OrderSide::Buy, 2, dec!(2.15))
            .await
            .unwrap();
        assert_eq!(id, "paper-1");
        let view = gateway.order_status(&id).await.unwrap();
        assert_eq!(view.status, OrderStatus::Filled);
        assert_eq!(view.fill_price, None); // books at the limit
        assert!(!gateway.cancel(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_paper_account_settles_immediately() {
        let account = PaperAccount::new(dec!(10000));
        // buy 2 contracts at 2.00: 400 of cash tied up
        account.debit(dec!(400)).await;
        let b = account.balances().await.unwrap();
        assert_eq!(b.available_cash, dec!(9600));
        assert_eq!(b.equity, dec!(10000));

        // sell at 2.50: proceeds back plus 100 realized
        account.credit(dec!(500), dec!(100)).await;
        let b = account.balances().await.unwrap();
        assert_eq!(b.available_cash, dec!(10100));
        assert_eq!(b.equity, dec!(10100));
        assert!(!b.is_margin_account);
    }
}
