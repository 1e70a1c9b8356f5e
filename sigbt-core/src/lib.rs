//! sigbt core: configuration, domain types, and the signal-driven engine.
//!
//! This crate holds everything needed to turn one price series plus one
//! pair of entry/exit signal series into a trade ledger and a per-bar
//! capital series:
//! - Run configuration and its validation
//! - Domain types (market data, open positions, closed trades, time series)
//! - The bar-by-bar signal processor with commission and slippage
//!
//! Metrics, multi-strategy orchestration, and export live in `sigbt-runner`.

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;

pub use config::{BacktestConfig, ConfigError, SignalPriority, Timeframe, TradeType};
pub use domain::{
    ClosedTrade, ExitReason, MarketData, OpenPosition, PositionSide, Signal, TimeSeriesStore,
    DEFAULT_STRATEGY,
};
pub use engine::{simulate, SimulationOutput};
pub use error::EngineError;
