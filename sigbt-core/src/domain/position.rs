//! Open positions: value records owned by the signal processor while a
//! trade is live.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Signal;

/// Direction of a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    Long,
    Short,
}

impl PositionSide {
    /// Side requested by an entry signal: `1` opens long, `-1` opens short.
    pub fn from_entry_signal(signal: Signal) -> Option<Self> {
        match signal {
            1 => Some(PositionSide::Long),
            -1 => Some(PositionSide::Short),
            _ => None,
        }
    }

    /// Exit-signal value that closes a position on this side.
    pub fn closing_signal(self) -> Signal {
        match self {
            PositionSide::Long => -1,
            PositionSide::Short => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PositionSide::Long => "long",
            PositionSide::Short => "short",
        }
    }
}

impl fmt::Display for PositionSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live position. Everything except `current_value` is fixed at entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub side: PositionSide,
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    /// Fill price after slippage.
    pub entry_price: f64,
    pub quantity: f64,
    pub entry_fee: f64,
    /// Capital committed at entry, fee included.
    pub entry_investment: f64,
    /// Mark-to-market value: `quantity * price` at the latest bar.
    pub current_value: f64,
}

impl OpenPosition {
    pub fn mark(&mut self, price: f64) {
        self.current_value = self.quantity * price;
    }

    /// Price move since entry as a fraction, positive when favorable.
    pub fn price_change_pct(&self, price: f64) -> f64 {
        match self.side {
            PositionSide::Long => (price - self.entry_price) / self.entry_price,
            PositionSide::Short => (self.entry_price - price) / self.entry_price,
        }
    }

    /// Bars elapsed since the entry bar.
    pub fn holding_period(&self, bar_index: usize) -> usize {
        bar_index.saturating_sub(self.entry_bar)
    }
}
