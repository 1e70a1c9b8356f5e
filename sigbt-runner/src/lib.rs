//! sigbt runner: orchestration, metrics, and reporting on top of `sigbt-core`.
//!
//! This crate provides:
//! - Single- and multi-strategy backtest orchestration (parallel across strategies)
//! - Performance metrics (returns, drawdown, Sharpe/Sortino/Calmar, trade stats)
//! - Account-detail reconstruction from the closed-trade ledger
//! - JSON, CSV, and Markdown export
//! - TOML run configs, CSV market-data loading, and signals from indicator states

pub mod account;
pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod result;
pub mod runner;
pub mod signals;

pub use account::{reconstruct_account, AccountReport, AccountRow, AccountSummary};
pub use config::{DataConfig, RunConfig, RunConfigError};
pub use data_loader::{load_market_csv, LoadError, LoadedData};
pub use export::{
    export_account_csv, export_equity_csv, export_json, export_series_csv, export_trades_csv,
    generate_comparison, generate_report, import_json, load_artifacts, save_artifacts,
};
pub use metrics::{EquityPoint, PerformanceMetrics};
pub use result::{BacktestResult, DEFAULT_STRATEGY, SCHEMA_VERSION};
pub use runner::{run_strategy, Backtest, BacktestOutcome, RunError, SignalInput};
pub use signals::{state_to_signals, SignalMode};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn performance_metrics_is_send_sync() {
        assert_send::<PerformanceMetrics>();
        assert_sync::<PerformanceMetrics>();
    }

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn backtest_is_send_sync() {
        assert_send::<Backtest>();
        assert_sync::<Backtest>();
    }

    #[test]
    fn account_report_is_send_sync() {
        assert_send::<AccountReport>();
        assert_sync::<AccountReport>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunConfig>();
        assert_sync::<RunConfig>();
        assert_send::<DataConfig>();
        assert_sync::<DataConfig>();
    }
}
