//! Signal processor: the bar-by-bar trade-lifecycle state machine.
//!
//! Per bar `i`:
//! 1. Mark every open position to `prices[i]`.
//! 2. Run exits and entries in the order given by [`SignalPriority`].
//! 3. Record available capital, position value, and total capital.
//!
//! After the last bar, open positions are either force-closed at the final
//! price or left open and reported as such.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::config::{BacktestConfig, SignalPriority};
use crate::domain::{
    ClosedTrade, ExitReason, MarketData, OpenPosition, PositionSide, Signal, TimeSeriesStore,
    DEFAULT_STRATEGY,
};
use crate::error::EngineError;

use super::cost_model::CostModel;
use super::exit_rules::ExitRules;

/// Everything a finished simulation produces.
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    pub series: TimeSeriesStore,
    /// Closed-trade ledger in closing order.
    pub trades: Vec<ClosedTrade>,
    /// Positions still open after the final bar (empty when force-closed).
    pub open_positions: Vec<OpenPosition>,
}

/// Check that a signal pair lines up with the market bars.
pub fn validate_signals(
    market: &MarketData,
    strategy: &str,
    entries: &[Signal],
    exits: &[Signal],
) -> Result<(), EngineError> {
    if entries.len() != market.len() || exits.len() != market.len() {
        return Err(EngineError::SignalLengthMismatch {
            strategy: strategy.to_string(),
            entries: entries.len(),
            exits: exits.len(),
            bars: market.len(),
        });
    }
    Ok(())
}

/// Mutable state for one strategy's run. Never shared across strategies.
pub struct SignalProcessor<'a> {
    market: &'a MarketData,
    entries: &'a [Signal],
    exits: &'a [Signal],
    config: &'a BacktestConfig,
    cost: CostModel,
    rules: ExitRules,

    capital: f64,
    open: Vec<OpenPosition>,
    trades: Vec<ClosedTrade>,
    series: TimeSeriesStore,
}

impl<'a> SignalProcessor<'a> {
    /// Validate inputs and allocate the run's buffers.
    pub fn new(
        market: &'a MarketData,
        entries: &'a [Signal],
        exits: &'a [Signal],
        config: &'a BacktestConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        validate_signals(market, DEFAULT_STRATEGY, entries, exits)?;

        let open_capacity = if config.max_positions > 0 {
            config.max_positions
        } else {
            10
        };

        Ok(Self {
            market,
            entries,
            exits,
            config,
            cost: CostModel::new(config.commission_pct, config.slippage_pct),
            rules: ExitRules::from_config(config),
            capital: config.initial_capital,
            open: Vec::with_capacity(open_capacity),
            trades: Vec::with_capacity((market.len() / 5).min(1000)),
            series: TimeSeriesStore::new(market.timestamps(), config.initial_capital),
        })
    }

    /// Simulate every bar, then apply end-of-run handling.
    pub fn run(mut self) -> SimulationOutput {
        for i in 0..self.market.len() {
            self.process_bar(i);
        }
        self.finish()
    }

    fn process_bar(&mut self, i: usize) {
        let price = self.market.prices()[i];
        let entry_signal = self.entries[i];
        let exit_signal = self.exits[i];

        for position in &mut self.open {
            position.mark(price);
        }

        match self.config.signal_priority {
            SignalPriority::ExitFirst => {
                self.process_exits(i, price, exit_signal);
                self.process_entry(i, price, entry_signal);
            }
            SignalPriority::EntryFirst => {
                self.process_entry(i, price, entry_signal);
                self.process_exits(i, price, exit_signal);
            }
            SignalPriority::SameBarTrade => {
                self.process_exits(i, price, exit_signal);
                let entered = self.process_entry(i, price, entry_signal);
                if entered && exit_signal != 0 {
                    self.process_exits(i, price, exit_signal);
                }
            }
        }

        let position_value = self.position_value();
        self.series.record_bar(i, self.capital, position_value);
    }

    /// Close every position whose exit rule fires. Returns how many closed.
    fn process_exits(&mut self, i: usize, price: f64, exit_signal: Signal) -> usize {
        let mut closed = 0;
        let mut slot = 0;
        while slot < self.open.len() {
            match self.rules.evaluate(&self.open[slot], i, price, exit_signal) {
                Some(reason) => {
                    let position = self.open.remove(slot);
                    self.close_position(position, i, price, reason);
                    closed += 1;
                }
                None => slot += 1,
            }
        }
        closed
    }

    /// Open a position if the signal, trade-type filter, position cap, and
    /// available capital all allow it. Returns whether one was opened.
    fn process_entry(&mut self, i: usize, price: f64, entry_signal: Signal) -> bool {
        if !self.config.has_position_capacity(self.open.len()) {
            return false;
        }
        let Some(side) = PositionSide::from_entry_signal(entry_signal) else {
            return false;
        };
        if !self.config.trade_type.accepts(side) {
            return false;
        }

        let trade_amount = self.capital * self.config.position_size_pct;
        if trade_amount <= 0.0 {
            return false;
        }

        let fill = self.cost.entry_fill(trade_amount, price, side);
        let entry_time = self.timestamp(i);
        debug!(
            bar = i,
            side = %side,
            price = fill.price,
            quantity = fill.quantity,
            amount = trade_amount,
            "open position"
        );

        self.capital -= trade_amount;
        self.open.push(OpenPosition {
            side,
            entry_bar: i,
            entry_time,
            entry_price: fill.price,
            quantity: fill.quantity,
            entry_fee: fill.fee,
            entry_investment: trade_amount,
            current_value: fill.invested,
        });
        true
    }

    fn close_position(&mut self, position: OpenPosition, i: usize, price: f64, reason: ExitReason) {
        let fill = self.cost.exit_fill(&position, price);
        debug!(
            bar = i,
            side = %position.side,
            price = fill.price,
            profit = fill.profit,
            reason = %reason,
            "close position"
        );

        self.capital += fill.value;
        let exit_time = self.timestamp(i);
        self.trades
            .push(ClosedTrade::from_position(position, i, exit_time, fill, reason));
    }

    fn finish(mut self) -> SimulationOutput {
        let last = self.market.last_index();

        if self.config.force_close_at_end && !self.open.is_empty() {
            let price = self.market.prices()[last];
            for position in std::mem::take(&mut self.open) {
                self.close_position(position, last, price, ExitReason::EndOfBacktest);
            }
            self.series.record_bar(last, self.capital, 0.0);
        }

        self.series.finalize_cumulative();

        SimulationOutput {
            series: self.series,
            trades: self.trades,
            open_positions: self.open,
        }
    }

    fn position_value(&self) -> f64 {
        self.open.iter().map(|p| p.current_value).sum()
    }

    fn timestamp(&self, i: usize) -> NaiveDateTime {
        self.market.timestamps()[i]
    }
}

/// Validate inputs and run one simulation.
pub fn simulate(
    market: &MarketData,
    entries: &[Signal],
    exits: &[Signal],
    config: &BacktestConfig,
) -> Result<SimulationOutput, EngineError> {
    Ok(SignalProcessor::new(market, entries, exits, config)?.run())
}
