//! Trading logic: signal detection, selection, risk, sizing, execution,
//! and position lifecycle.

mod config;
mod executor;
mod hours;
mod lifecycle;
mod risk;
mod selector;
mod signal;
mod sizer;

pub use config::{
    EngineConfig, ExecutorConfig, ExitConfig, HoursConfig, RiskConfig, SelectorConfig,
    SignalConfig, SizerConfig,
};
pub use executor::{ExitOutcome, Fill, OrderExecutor};
pub use hours::TradingHours;
pub use lifecycle::{Alert, ExitDecision, LifecycleManager};
pub use risk::{GateDecision, RiskGate, RiskState};
pub use selector::{CandidateSelector, RejectionCounts, Selection};
pub use signal::{Direction, Signal, SignalDetector};
pub use sizer::PositionSizer;
