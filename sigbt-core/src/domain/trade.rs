//! ClosedTrade: an immutable ledger entry for a finished round trip.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::position::{OpenPosition, PositionSide};

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    ExitSignal,
    MaxHoldingPeriod,
    /// Closed at the final bar because `force_close_at_end` was set.
    EndOfBacktest,
}

impl ExitReason {
    /// Human-readable label used in reports and CSV exports.
    pub fn label(self) -> &'static str {
        match self {
            ExitReason::TakeProfit => "Take Profit",
            ExitReason::StopLoss => "Stop Loss",
            ExitReason::ExitSignal => "Exit Signal",
            ExitReason::MaxHoldingPeriod => "Max Holding Period Reached",
            ExitReason::EndOfBacktest => "End of Backtest",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Settlement of a closing fill, as computed by the cost model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitFill {
    /// Fill price after slippage.
    pub price: f64,
    pub fee: f64,
    /// Capital released back to the account.
    pub value: f64,
    pub profit: f64,
}

/// A completed trade: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub side: PositionSide,

    // ── Entry ──
    pub entry_bar: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price: f64,
    pub quantity: f64,
    pub entry_fee: f64,
    pub entry_investment: f64,

    // ── Exit ──
    pub exit_bar: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price: f64,
    pub exit_fee: f64,
    pub exit_value: f64,

    // ── PnL ──
    pub profit: f64,
    /// Profit as a percentage of `entry_investment`.
    pub profit_pct: f64,
    pub exit_reason: ExitReason,
}

impl ClosedTrade {
    /// Convert a live position into a ledger entry.
    pub fn from_position(
        position: OpenPosition,
        exit_bar: usize,
        exit_time: NaiveDateTime,
        fill: ExitFill,
        exit_reason: ExitReason,
    ) -> Self {
        let profit_pct = if position.entry_investment != 0.0 {
            fill.profit / position.entry_investment * 100.0
        } else {
            0.0
        };
        Self {
            side: position.side,
            entry_bar: position.entry_bar,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            quantity: position.quantity,
            entry_fee: position.entry_fee,
            entry_investment: position.entry_investment,
            exit_bar,
            exit_time,
            exit_price: fill.price,
            exit_fee: fill.fee,
            exit_value: fill.value,
            profit: fill.profit,
            profit_pct,
            exit_reason,
        }
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar.saturating_sub(self.entry_bar)
    }

    pub fn is_winner(&self) -> bool {
        self.profit > 0.0
    }
}
