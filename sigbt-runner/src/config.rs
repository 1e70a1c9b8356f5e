//! Run configuration files: TOML describing the backtest parameters and
//! where the market data and signal columns live.
//!
//! ```toml
//! [backtest]
//! timeframe = "1h"
//! commission_pct = 0.001
//! signal_priority = "same_bar_trade"
//!
//! [data]
//! path = "btc_1h.csv"
//! strategies = ["fast", "slow"]   # reads entry_fast/exit_fast, entry_slow/exit_slow
//! signal_mode = "cross"            # optional: columns hold 0/1 states, not signals
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sigbt_core::config::{BacktestConfig, ConfigError};

use crate::result::DEFAULT_STRATEGY;
use crate::signals::SignalMode;

#[derive(Debug, Error)]
pub enum RunConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Invalid(#[from] ConfigError),
    #[error("duplicate strategy name '{0}'")]
    DuplicateStrategy(String),
}

/// A full run: engine parameters plus data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub backtest: BacktestConfig,
    pub data: DataConfig,
}

/// Where to find prices, timestamps, and signals in a CSV file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub path: PathBuf,
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,
    #[serde(default = "default_price_column")]
    pub price_column: String,
    #[serde(default = "default_entry_column")]
    pub entry_column: String,
    #[serde(default = "default_exit_column")]
    pub exit_column: String,
    /// Named strategies. When set, signal columns are `entry_<name>` and
    /// `exit_<name>` and the entry/exit column settings are ignored.
    #[serde(default)]
    pub strategies: Vec<String>,
    /// When set, the entry/exit columns hold indicator states (`1`/`true`
    /// active) that are turned into signals for the run's trade type.
    #[serde(default)]
    pub signal_mode: Option<SignalMode>,
}

fn default_timestamp_column() -> String {
    "timestamp".into()
}
fn default_price_column() -> String {
    "close".into()
}
fn default_entry_column() -> String {
    "entry".into()
}
fn default_exit_column() -> String {
    "exit".into()
}

/// Column pair holding one strategy's signals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalColumns {
    pub strategy: String,
    pub entry: String,
    pub exit: String,
}

impl DataConfig {
    /// A config reading `path` with every column at its default name.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timestamp_column: default_timestamp_column(),
            price_column: default_price_column(),
            entry_column: default_entry_column(),
            exit_column: default_exit_column(),
            strategies: Vec::new(),
            signal_mode: None,
        }
    }

    pub fn is_multi(&self) -> bool {
        !self.strategies.is_empty()
    }

    pub fn signal_columns(&self) -> Vec<SignalColumns> {
        if self.strategies.is_empty() {
            return vec![SignalColumns {
                strategy: DEFAULT_STRATEGY.to_string(),
                entry: self.entry_column.clone(),
                exit: self.exit_column.clone(),
            }];
        }
        self.strategies
            .iter()
            .map(|name| SignalColumns {
                strategy: name.clone(),
                entry: format!("entry_{name}"),
                exit: format!("exit_{name}"),
            })
            .collect()
    }
}

impl RunConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, RunConfigError> {
        let config: RunConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a TOML file. A relative data path is resolved against the
    /// config file's directory.
    pub fn from_file(path: &Path) -> Result<Self, RunConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| RunConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if config.data.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.data.path = dir.join(&config.data.path);
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), RunConfigError> {
        self.backtest.validate()?;
        let mut seen = std::collections::BTreeSet::new();
        for name in &self.data.strategies {
            if !seen.insert(name.as_str()) {
                return Err(RunConfigError::DuplicateStrategy(name.clone()));
            }
        }
        Ok(())
    }
}
