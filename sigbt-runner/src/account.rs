//! Account-detail reconstruction: replays the closed-trade ledger against
//! the price series to rebuild a per-bar account statement.
//!
//! Only closed trades are replayed. Positions left open at the end of a run
//! without force close do not appear here, unlike in the engine's own
//! capital series.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use sigbt_core::domain::ClosedTrade;

use crate::result::BacktestResult;

/// Account state at one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRow {
    pub timestamp: NaiveDateTime,
    pub price: f64,
    pub balance: f64,
    pub position_value: f64,
    pub total_value: f64,
    pub profit_loss: f64,
    /// Percent.
    pub cumulative_return: f64,
    /// Percent below the running peak.
    pub drawdown: f64,
    pub active_trades: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub initial_capital: f64,
    pub final_value: f64,
    /// Percent.
    pub total_return: f64,
    /// Percent.
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub data_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountReport {
    pub rows: Vec<AccountRow>,
    pub summary: AccountSummary,
}

#[derive(Debug, Clone, Copy)]
enum LedgerEvent {
    Entry(usize),
    Exit(usize),
}

/// Rebuild the account statement for a finished run.
///
/// Returns `None` when the run closed no trades.
pub fn reconstruct_account(result: &BacktestResult) -> Option<AccountReport> {
    reconstruct_from_parts(
        &result.trades,
        &result.prices,
        &result.series.timestamps,
        result.config.initial_capital,
    )
}

/// Replay `trades` over aligned `prices` and `timestamps`.
///
/// Entries debit `entry_investment` and exits credit `exit_value`; every
/// event stamped at or before a bar's timestamp is applied before that bar
/// is valued. Returns `None` with no trades or empty/misaligned arrays.
pub fn reconstruct_from_parts(
    trades: &[ClosedTrade],
    prices: &[f64],
    timestamps: &[NaiveDateTime],
    initial_capital: f64,
) -> Option<AccountReport> {
    if trades.is_empty() || prices.is_empty() || prices.len() != timestamps.len() {
        return None;
    }

    let mut events: Vec<(NaiveDateTime, LedgerEvent)> = trades
        .iter()
        .enumerate()
        .flat_map(|(id, t)| {
            [
                (t.entry_time, LedgerEvent::Entry(id)),
                (t.exit_time, LedgerEvent::Exit(id)),
            ]
        })
        .collect();
    events.sort_by_key(|(time, _)| *time);

    let mut active = vec![false; trades.len()];
    let mut balance = initial_capital;
    let mut peak = initial_capital;
    let mut next_event = 0;
    let mut rows = Vec::with_capacity(prices.len());

    for (&timestamp, &price) in timestamps.iter().zip(prices) {
        while next_event < events.len() && events[next_event].0 <= timestamp {
            match events[next_event].1 {
                LedgerEvent::Entry(id) => {
                    balance -= trades[id].entry_investment;
                    active[id] = true;
                }
                LedgerEvent::Exit(id) => {
                    balance += trades[id].exit_value;
                    active[id] = false;
                }
            }
            next_event += 1;
        }

        let position_value: f64 = trades
            .iter()
            .zip(&active)
            .filter(|&(_, &open)| open)
            .map(|(t, _)| t.quantity * price)
            .sum();
        let total_value = balance + position_value;

        peak = peak.max(total_value);
        let drawdown = if peak > 0.0 {
            (peak - total_value) / peak * 100.0
        } else {
            0.0
        };

        rows.push(AccountRow {
            timestamp,
            price,
            balance,
            position_value,
            total_value,
            profit_loss: total_value - initial_capital,
            cumulative_return: (total_value / initial_capital - 1.0) * 100.0,
            drawdown,
            active_trades: active.iter().filter(|&&open| open).count(),
        });
    }

    let final_value = rows.last().map_or(initial_capital, |r| r.total_value);
    let max_drawdown = rows.iter().map(|r| r.drawdown).fold(0.0, f64::max);

    Some(AccountReport {
        summary: AccountSummary {
            initial_capital,
            final_value,
            total_return: (final_value / initial_capital - 1.0) * 100.0,
            max_drawdown,
            total_trades: trades.len(),
            data_points: rows.len(),
        },
        rows,
    })
}
