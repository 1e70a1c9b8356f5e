//! Exit rules: decide whether an open position closes on the current bar.
//!
//! Checked in fixed priority order; the first rule that fires wins:
//! take-profit, stop-loss, max holding period, exit signal.

use crate::config::BacktestConfig;
use crate::domain::{ExitReason, OpenPosition, Signal};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitRules {
    /// 0 disables.
    pub take_profit_pct: f64,
    /// 0 disables.
    pub stop_loss_pct: f64,
    pub min_holding_period: usize,
    /// 0 means unlimited.
    pub max_holding_period: usize,
}

impl ExitRules {
    pub fn from_config(config: &BacktestConfig) -> Self {
        Self {
            take_profit_pct: config.take_profit_pct,
            stop_loss_pct: config.stop_loss_pct,
            min_holding_period: config.min_holding_period,
            max_holding_period: config.max_holding_period,
        }
    }

    /// Evaluate one position at `bar_index` with market `price`.
    ///
    /// An exit signal arriving before `min_holding_period` bars have elapsed
    /// is ignored for this bar only.
    pub fn evaluate(
        &self,
        position: &OpenPosition,
        bar_index: usize,
        price: f64,
        exit_signal: Signal,
    ) -> Option<ExitReason> {
        let change = position.price_change_pct(price);
        let held = position.holding_period(bar_index);

        if self.take_profit_pct > 0.0 && change >= self.take_profit_pct {
            Some(ExitReason::TakeProfit)
        } else if self.stop_loss_pct > 0.0 && change <= -self.stop_loss_pct {
            Some(ExitReason::StopLoss)
        } else if self.max_holding_period > 0 && held >= self.max_holding_period {
            Some(ExitReason::MaxHoldingPeriod)
        } else if exit_signal == position.side.closing_signal() && held >= self.min_holding_period {
            Some(ExitReason::ExitSignal)
        } else {
            None
        }
    }
}
