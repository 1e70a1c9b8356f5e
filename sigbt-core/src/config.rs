//! Run configuration: validated, immutable parameters for one simulation.
//!
//! A `BacktestConfig` is built once (from code or a TOML/JSON file), checked
//! with [`BacktestConfig::validate`], and then only read for the rest of the run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::domain::PositionSide;

/// Errors raised while validating or parsing configuration values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("initial_capital must be finite and > 0, got {0}")]
    InvalidCapital(f64),

    #[error("position_size_pct must be in (0, 1], got {0}")]
    InvalidPositionSize(f64),

    #[error("{field} must be in [0, 1), got {value}")]
    InvalidRate { field: &'static str, value: f64 },

    #[error("{field} must be finite and >= 0, got {value}")]
    InvalidThreshold { field: &'static str, value: f64 },

    #[error("unknown trade type '{0}' (valid: long, short, long_short)")]
    UnknownTradeType(String),

    #[error("unknown signal priority '{0}' (valid: exit_first, entry_first, same_bar_trade)")]
    UnknownSignalPriority(String),
}

// ─── Timeframe ──────────────────────────────────────────────────────

/// Bar timeframe label such as `"1d"` or `"15m"`.
///
/// The label is kept verbatim; it only matters for annualization. Unknown
/// labels are accepted and annualize as daily bars.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeframe(String);

impl Timeframe {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    /// Number of bars in one year for this timeframe.
    pub fn periods_per_year(&self) -> u32 {
        match self.0.as_str() {
            "1d" => 365,
            "4h" => 365 * 6,
            "1h" => 365 * 24,
            "30m" => 365 * 48,
            "15m" => 365 * 96,
            "5m" => 365 * 288,
            "1m" => 365 * 1440,
            _ => 365,
        }
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::new("1d")
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─── Trade type filter ──────────────────────────────────────────────

/// Which entry directions the run is allowed to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeType {
    #[default]
    #[serde(alias = "long_only")]
    Long,
    #[serde(alias = "short_only")]
    Short,
    LongShort,
}

impl TradeType {
    /// Whether a position on `side` may be opened under this filter.
    pub fn accepts(self, side: PositionSide) -> bool {
        match self {
            TradeType::Long => side == PositionSide::Long,
            TradeType::Short => side == PositionSide::Short,
            TradeType::LongShort => true,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TradeType::Long => "long",
            TradeType::Short => "short",
            TradeType::LongShort => "long_short",
        }
    }
}

impl FromStr for TradeType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "long" | "long_only" => Ok(TradeType::Long),
            "short" | "short_only" => Ok(TradeType::Short),
            "long_short" => Ok(TradeType::LongShort),
            _ => Err(ConfigError::UnknownTradeType(s.to_string())),
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Signal priority ────────────────────────────────────────────────

/// Ordering of exit and entry evaluation within a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalPriority {
    /// Exits, then entries.
    #[default]
    ExitFirst,
    /// Entries, then exits.
    EntryFirst,
    /// Exits, then entries, then exits again if an entry opened and the
    /// bar carries a non-zero exit signal.
    SameBarTrade,
}

impl SignalPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalPriority::ExitFirst => "exit_first",
            SignalPriority::EntryFirst => "entry_first",
            SignalPriority::SameBarTrade => "same_bar_trade",
        }
    }
}

impl FromStr for SignalPriority {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exit_first" => Ok(SignalPriority::ExitFirst),
            "entry_first" => Ok(SignalPriority::EntryFirst),
            "same_bar_trade" => Ok(SignalPriority::SameBarTrade),
            _ => Err(ConfigError::UnknownSignalPriority(s.to_string())),
        }
    }
}

impl fmt::Display for SignalPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── BacktestConfig ─────────────────────────────────────────────────

/// All parameters of a single simulation run.
///
/// Fractions are plain fractions (0.001 = 0.1%), not percentages. A zero
/// take-profit, stop-loss, max holding period, or max positions disables
/// that rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub timeframe: Timeframe,
    pub trade_type: TradeType,
    pub initial_capital: f64,
    /// Fraction of available capital committed per entry.
    pub position_size_pct: f64,
    pub commission_pct: f64,
    pub take_profit_pct: f64,
    pub stop_loss_pct: f64,
    /// Bars that must elapse before an exit signal may close a position.
    pub min_holding_period: usize,
    pub max_holding_period: usize,
    pub slippage_pct: f64,
    pub max_positions: usize,
    pub force_close_at_end: bool,
    pub signal_priority: SignalPriority,
    /// Annual risk-free rate used for Sharpe and Sortino.
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            timeframe: Timeframe::default(),
            trade_type: TradeType::Long,
            initial_capital: 10_000.0,
            position_size_pct: 1.0,
            commission_pct: 0.001,
            take_profit_pct: 0.0,
            stop_loss_pct: 0.0,
            min_holding_period: 1,
            max_holding_period: 0,
            slippage_pct: 0.0,
            max_positions: 1,
            force_close_at_end: true,
            signal_priority: SignalPriority::ExitFirst,
            risk_free_rate: 0.0,
        }
    }
}

impl BacktestConfig {
    /// A config with no commission, slippage, or holding constraints.
    pub fn frictionless(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            commission_pct: 0.0,
            min_holding_period: 0,
            ..Self::default()
        }
    }

    /// Check every numeric field. Must pass before a run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(ConfigError::InvalidCapital(self.initial_capital));
        }
        if !(self.position_size_pct > 0.0 && self.position_size_pct <= 1.0) {
            return Err(ConfigError::InvalidPositionSize(self.position_size_pct));
        }
        check_rate("commission_pct", self.commission_pct)?;
        check_rate("slippage_pct", self.slippage_pct)?;
        check_threshold("take_profit_pct", self.take_profit_pct)?;
        check_threshold("stop_loss_pct", self.stop_loss_pct)?;
        check_threshold("risk_free_rate", self.risk_free_rate)?;
        Ok(())
    }

    pub fn periods_per_year(&self) -> u32 {
        self.timeframe.periods_per_year()
    }

    /// Whether another position may be opened while `open_count` are held.
    pub fn has_position_capacity(&self, open_count: usize) -> bool {
        self.max_positions == 0 || open_count < self.max_positions
    }
}

fn check_rate(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate { field, value })
    }
}

fn check_threshold(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidThreshold { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = BacktestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_positions, 1);
        assert_eq!(config.signal_priority, SignalPriority::ExitFirst);
        assert!(config.force_close_at_end);
    }

    #[test]
    fn periods_per_year_table() {
        assert_eq!(Timeframe::new("1d").periods_per_year(), 365);
        assert_eq!(Timeframe::new("1h").periods_per_year(), 8760);
        assert_eq!(Timeframe::new("4h").periods_per_year(), 2190);
        assert_eq!(Timeframe::new("30m").periods_per_year(), 17520);
        assert_eq!(Timeframe::new("15m").periods_per_year(), 35040);
        assert_eq!(Timeframe::new("5m").periods_per_year(), 105120);
        assert_eq!(Timeframe::new("1m").periods_per_year(), 525600);
    }

    #[test]
    fn unknown_timeframe_falls_back_to_daily() {
        assert_eq!(Timeframe::new("1w").periods_per_year(), 365);
        assert_eq!(Timeframe::new("").periods_per_year(), 365);
    }

    #[test]
    fn trade_type_filter() {
        assert!(TradeType::Long.accepts(PositionSide::Long));
        assert!(!TradeType::Long.accepts(PositionSide::Short));
        assert!(TradeType::Short.accepts(PositionSide::Short));
        assert!(!TradeType::Short.accepts(PositionSide::Long));
        assert!(TradeType::LongShort.accepts(PositionSide::Long));
        assert!(TradeType::LongShort.accepts(PositionSide::Short));
    }

    #[test]
    fn trade_type_parsing() {
        assert_eq!("LONG".parse::<TradeType>().unwrap(), TradeType::Long);
        assert_eq!("long_only".parse::<TradeType>().unwrap(), TradeType::Long);
        assert_eq!("short".parse::<TradeType>().unwrap(), TradeType::Short);
        assert_eq!("long_short".parse::<TradeType>().unwrap(), TradeType::LongShort);
        assert!(matches!(
            "both".parse::<TradeType>(),
            Err(ConfigError::UnknownTradeType(_))
        ));
    }

    #[test]
    fn priority_parsing() {
        assert_eq!(
            "same_bar_trade".parse::<SignalPriority>().unwrap(),
            SignalPriority::SameBarTrade
        );
        assert_eq!(
            "entry_first".parse::<SignalPriority>().unwrap(),
            SignalPriority::EntryFirst
        );
        assert!("later".parse::<SignalPriority>().is_err());
    }

    #[test]
    fn rejects_bad_capital() {
        let config = BacktestConfig {
            initial_capital: 0.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidCapital(0.0)));

        let config = BacktestConfig {
            initial_capital: f64::INFINITY,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_position_size() {
        for size in [0.0, -0.5, 1.5, f64::NAN] {
            let config = BacktestConfig {
                position_size_pct: size,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "size {size} should be rejected");
        }
    }

    #[test]
    fn rejects_bad_rates() {
        let config = BacktestConfig {
            commission_pct: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRate {
                field: "commission_pct",
                ..
            })
        ));

        let config = BacktestConfig {
            slippage_pct: -0.01,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BacktestConfig {
            stop_loss_pct: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold {
                field: "stop_loss_pct",
                ..
            })
        ));
    }

    #[test]
    fn position_capacity() {
        let capped = BacktestConfig {
            max_positions: 2,
            ..Default::default()
        };
        assert!(capped.has_position_capacity(1));
        assert!(!capped.has_position_capacity(2));

        let unlimited = BacktestConfig {
            max_positions: 0,
            ..Default::default()
        };
        assert!(unlimited.has_position_capacity(10_000));
    }

    #[test]
    fn deserializes_partial_json_with_defaults() {
        let json = r#"{"trade_type":"long_short","signal_priority":"same_bar_trade","timeframe":"4h"}"#;
        let config: BacktestConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.trade_type, TradeType::LongShort);
        assert_eq!(config.signal_priority, SignalPriority::SameBarTrade);
        assert_eq!(config.periods_per_year(), 2190);
        assert_eq!(config.initial_capital, 10_000.0);
    }
}
