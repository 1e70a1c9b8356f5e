//! Engine construction errors. All of them are raised before the first bar
//! is simulated; a run that starts always completes.

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("prices ({prices}) and timestamps ({timestamps}) must have the same length")]
    MarketLengthMismatch { prices: usize, timestamps: usize },

    #[error(
        "strategy '{strategy}': entries ({entries}) and exits ({exits}) must match the {bars} price bars"
    )]
    SignalLengthMismatch {
        strategy: String,
        entries: usize,
        exits: usize,
        bars: usize,
    },

    #[error("exit signals not found for strategy '{0}'")]
    MissingExitSeries(String),

    #[error("input series are empty")]
    EmptySeries,

    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
}
