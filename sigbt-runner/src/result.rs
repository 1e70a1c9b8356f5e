//! Backtest result: the explicit, self-contained output of one strategy run.
//!
//! A result owns everything later tooling needs (ledger, capital series,
//! prices), so account reconstruction and export take it as an argument
//! instead of reaching for shared state.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use sigbt_core::config::BacktestConfig;
use sigbt_core::domain::{ClosedTrade, MarketData, OpenPosition, Signal, TimeSeriesStore};

use crate::metrics::PerformanceMetrics;

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

pub use sigbt_core::domain::DEFAULT_STRATEGY;

/// Complete result of one strategy's simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// BLAKE3 fingerprint of config, strategy key, and inputs.
    pub run_id: String,
    pub strategy: String,
    pub config: BacktestConfig,
    pub metrics: PerformanceMetrics,
    pub trades: Vec<ClosedTrade>,
    /// Positions still open at the last bar (only when force close is off).
    #[serde(default)]
    pub open_positions: Vec<OpenPosition>,
    pub series: TimeSeriesStore,
    pub prices: Vec<f64>,
    /// Entry and exit signals the run consumed, aligned with `prices`.
    #[serde(default)]
    pub entries: Vec<Signal>,
    #[serde(default)]
    pub exits: Vec<Signal>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn metrics(&self) -> &PerformanceMetrics {
        &self.metrics
    }

    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    pub fn total_capital(&self) -> &[f64] {
        &self.series.total_capital
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.series.timestamps
    }

    /// First 12 hex chars of the run id, used for artifact directory names.
    pub fn short_id(&self) -> &str {
        self.run_id.get(..12).unwrap_or(&self.run_id)
    }
}

/// Deterministic fingerprint of one strategy run's inputs.
pub fn run_id(
    config: &BacktestConfig,
    strategy: &str,
    market: &MarketData,
    entries: &[Signal],
    exits: &[Signal],
) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(format!("{config:?}").as_bytes());
    hasher.update(strategy.as_bytes());
    for price in market.prices() {
        hasher.update(&price.to_le_bytes());
    }
    for ts in market.timestamps() {
        hasher.update(ts.to_string().as_bytes());
    }
    for &s in entries.iter().chain(exits) {
        hasher.update(&s.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
