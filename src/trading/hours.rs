//! Session clock: when the market is open, when entries stop, when
//! everything must be flat.

use anyhow::Context;
use chrono::{Datelike, NaiveTime, Weekday};

use super::config::HoursConfig;

/// Parsed session windows, all in exchange local time.
#[derive(Debug, Clone, Copy)]
pub struct TradingHours {
    pub open: NaiveTime,
    pub close: NaiveTime,
    pub no_entries_after: NaiveTime,
    pub eod_exit: NaiveTime,
}

impl TradingHours {
    pub fn from_config(config: &HoursConfig) -> anyhow::Result<Self> {
        let parse = |s: &str, what: &str| {
            NaiveTime::parse_from_str(s, "%H:%M")
                .with_context(|| format!("invalid {what} time {s:?}, expected HH:MM"))
        };

        let hours = Self {
            open: parse(&config.open, "open")?,
            close: parse(&config.close, "close")?,
            no_entries_after: parse(&config.no_entries_after, "entry cutoff")?,
            eod_exit: parse(&config.eod_exit, "EOD exit")?,
        };
        anyhow::ensure!(
            hours.open < hours.eod_exit && hours.eod_exit <= hours.close,
            "session windows out of order"
        );
        Ok(hours)
    }

    fn is_weekday(weekday: Weekday) -> bool {
        !matches!(weekday, Weekday::Sat | Weekday::Sun)
    }

    /// Within the regular session (exits and management allowed).
    pub fn is_open(&self, now: chrono::NaiveDateTime) -> bool {
        let t = now.time();
        Self::is_weekday(now.weekday()) && t >= self.open && t < self.close
    }

    /// Within the entry window. Closes at the entry cutoff even though the
    /// session keeps running.
    pub fn entries_allowed(&self, now: chrono::NaiveDateTime) -> bool {
        self.is_open(now) && now.time() < self.no_entries_after
    }

    /// Past the forced-flat cutoff.
    pub fn past_eod_exit(&self, now: chrono::NaiveDateTime) -> bool {
        now.time() >= self.eod_exit
    }
}
