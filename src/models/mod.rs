//! Data models for quotes, instruments, candidates, positions, and records.

mod candidate;
mod instrument;
mod position;
mod quote;
mod record;

pub use candidate::{load_watchlist, Candidate};
pub use instrument::{Instrument, InstrumentKind};
pub use position::{Position, PositionState, Side};
pub use quote::Quote;
pub use record::{ExitReason, SignalKind, TradeRecord};
