//! Backtest orchestrator: validates inputs, runs the signal processor for
//! each strategy, and wraps the output with metrics.
//!
//! Two modes:
//! - Single: one entry/exit pair, reported under the `"default"` key.
//! - Multi: name-keyed entry/exit maps sharing one market series. Strategies
//!   run in parallel, each with its own processor and buffers.
//!
//! All validation happens in [`Backtest::new`]; nothing is simulated for a
//! configuration that fails.

use std::collections::BTreeMap;

use rayon::prelude::*;
use thiserror::Error;
use tracing::info;

use sigbt_core::config::BacktestConfig;
use sigbt_core::domain::{MarketData, Signal};
use sigbt_core::engine::{simulate, validate_signals};
use sigbt_core::error::EngineError;

use crate::metrics::PerformanceMetrics;
use crate::result::{run_id, BacktestResult, DEFAULT_STRATEGY};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("no strategies given")]
    NoStrategies,
}

/// Entry/exit signal input for a run.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalInput {
    Single {
        entries: Vec<Signal>,
        exits: Vec<Signal>,
    },
    /// Every entry key needs a matching exit key. Exit keys without an entry
    /// key are ignored.
    Multi {
        entries: BTreeMap<String, Vec<Signal>>,
        exits: BTreeMap<String, Vec<Signal>>,
    },
}

impl SignalInput {
    pub fn single(entries: Vec<Signal>, exits: Vec<Signal>) -> Self {
        SignalInput::Single { entries, exits }
    }

    pub fn strategy_count(&self) -> usize {
        match self {
            SignalInput::Single { .. } => 1,
            SignalInput::Multi { entries, .. } => entries.len(),
        }
    }
}

/// Output of [`Backtest::run`], shaped like its input.
#[derive(Debug, Clone)]
pub enum BacktestOutcome {
    Single(BacktestResult),
    Multi(BTreeMap<String, BacktestResult>),
}

impl BacktestOutcome {
    /// All results in key order.
    pub fn results(&self) -> Vec<&BacktestResult> {
        match self {
            BacktestOutcome::Single(result) => vec![result],
            BacktestOutcome::Multi(map) => map.values().collect(),
        }
    }

    pub fn into_results(self) -> Vec<BacktestResult> {
        match self {
            BacktestOutcome::Single(result) => vec![result],
            BacktestOutcome::Multi(map) => map.into_values().collect(),
        }
    }
}

/// A validated, ready-to-run backtest.
#[derive(Debug, Clone)]
pub struct Backtest {
    market: MarketData,
    signals: SignalInput,
    config: BacktestConfig,
}

impl Backtest {
    /// Check the config and every signal series against the market data.
    pub fn new(
        market: MarketData,
        signals: SignalInput,
        config: BacktestConfig,
    ) -> Result<Self, RunError> {
        config.validate().map_err(EngineError::from)?;

        match &signals {
            SignalInput::Single { entries, exits } => {
                validate_signals(&market, DEFAULT_STRATEGY, entries, exits)?;
            }
            SignalInput::Multi { entries, exits } => {
                if entries.is_empty() {
                    return Err(RunError::NoStrategies);
                }
                for (name, entry_series) in entries {
                    let exit_series = exits
                        .get(name)
                        .ok_or_else(|| EngineError::MissingExitSeries(name.clone()))?;
                    validate_signals(&market, name, entry_series, exit_series)?;
                }
            }
        }

        Ok(Self {
            market,
            signals,
            config,
        })
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn market(&self) -> &MarketData {
        &self.market
    }

    /// Simulate every strategy and compute its metrics.
    pub fn run(&self) -> Result<BacktestOutcome, RunError> {
        match &self.signals {
            SignalInput::Single { entries, exits } => {
                let result = run_strategy(&self.market, DEFAULT_STRATEGY, entries, exits, &self.config)?;
                Ok(BacktestOutcome::Single(result))
            }
            SignalInput::Multi { entries, exits } => {
                let results = entries
                    .par_iter()
                    .map(|(name, entry_series)| -> Result<(String, BacktestResult), RunError> {
                        let exit_series = exits
                            .get(name)
                            .ok_or_else(|| EngineError::MissingExitSeries(name.clone()))?;
                        let result =
                            run_strategy(&self.market, name, entry_series, exit_series, &self.config)?;
                        Ok((name.clone(), result))
                    })
                    .collect::<Result<BTreeMap<_, _>, RunError>>()?;
                Ok(BacktestOutcome::Multi(results))
            }
        }
    }
}

/// Run one strategy end to end: simulate, score, and package the result.
pub fn run_strategy(
    market: &MarketData,
    strategy: &str,
    entries: &[Signal],
    exits: &[Signal],
    config: &BacktestConfig,
) -> Result<BacktestResult, RunError> {
    validate_signals(market, strategy, entries, exits)?;
    let output = simulate(market, entries, exits, config)?;
    let metrics = PerformanceMetrics::compute(&output.series, &output.trades, config);

    info!(
        strategy,
        bars = market.len(),
        trades = metrics.total_trades,
        open = output.open_positions.len(),
        total_return = metrics.total_return,
        "backtest complete"
    );

    Ok(BacktestResult {
        schema_version: crate::result::SCHEMA_VERSION,
        run_id: run_id(config, strategy, market, entries, exits),
        strategy: strategy.to_string(),
        config: config.clone(),
        metrics,
        trades: output.trades,
        open_positions: output.open_positions,
        series: output.series,
        prices: market.prices().to_vec(),
        entries: entries.to_vec(),
        exits: exits.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sigbt_core::config::ConfigError;

    fn market(n: usize) -> MarketData {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        MarketData::new(
            (0..n).map(|i| 100.0 + i as f64).collect(),
            (0..n).map(|i| base + chrono::Duration::days(i as i64)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn invalid_config_fails_before_running() {
        let config = BacktestConfig {
            initial_capital: -1.0,
            ..BacktestConfig::default()
        };
        let err = Backtest::new(market(3), SignalInput::single(vec![0; 3], vec![0; 3]), config)
            .unwrap_err();
        assert!(matches!(
            err,
            RunError::Engine(EngineError::Config(ConfigError::InvalidCapital(_)))
        ));
    }

    #[test]
    fn missing_exit_key_is_reported_by_name() {
        let mut entries = BTreeMap::new();
        entries.insert("fast".to_string(), vec![0; 3]);
        entries.insert("slow".to_string(), vec![0; 3]);
        let mut exits = BTreeMap::new();
        exits.insert("fast".to_string(), vec![0; 3]);

        let err = Backtest::new(
            market(3),
            SignalInput::Multi { entries, exits },
            BacktestConfig::default(),
        )
        .unwrap_err();
        match err {
            RunError::Engine(EngineError::MissingExitSeries(name)) => assert_eq!(name, "slow"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_multi_input_is_rejected() {
        let err = Backtest::new(
            market(3),
            SignalInput::Multi {
                entries: BTreeMap::new(),
                exits: BTreeMap::new(),
            },
            BacktestConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::NoStrategies));
    }

    #[test]
    fn single_mode_uses_default_key() {
        let bt = Backtest::new(
            market(4),
            SignalInput::single(vec![1, 0, 0, 0], vec![0, 0, -1, 0]),
            BacktestConfig::frictionless(10_000.0),
        )
        .unwrap();
        let BacktestOutcome::Single(result) = bt.run().unwrap() else {
            panic!("expected single outcome");
        };
        assert_eq!(result.strategy, DEFAULT_STRATEGY);
        assert_eq!(result.trades().len(), 1);
        assert_eq!(result.prices().len(), 4);
        assert_eq!(result.total_capital().len(), 4);
    }
}
