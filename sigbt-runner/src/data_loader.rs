//! CSV market-data loading.
//!
//! Reads one CSV file holding a timestamp column, a price column, and one
//! or more entry/exit signal column pairs (see [`DataConfig`]), and turns it
//! into [`MarketData`] plus a [`SignalInput`] ready for the runner.
//!
//! Timestamps may be `%Y-%m-%d %H:%M:%S`, `%Y-%m-%dT%H:%M:%S`, `%Y-%m-%d`,
//! or a numeric Unix epoch (seconds, or milliseconds above 1e10). Signal
//! cells accept integers, integral floats, booleans, or blank (= 0).
//!
//! With `signal_mode` set, the signal columns are read as indicator states
//! (active when the cell is `1` or `true`) and converted with
//! [`state_to_signals`] for the run's trade type.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;
use tracing::debug;

use sigbt_core::config::TradeType;
use sigbt_core::domain::{MarketData, Signal};
use sigbt_core::error::EngineError;

use crate::config::DataConfig;
use crate::runner::SignalInput;
use crate::signals::state_to_signals;

/// Epoch values above this are read as milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e10;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("column '{0}' not found in CSV header")]
    MissingColumn(String),
    #[error("row {row}, column '{column}': cannot parse '{value}'")]
    InvalidCell {
        row: usize,
        column: String,
        value: String,
    },
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Market data and signals read from one file.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub market: MarketData,
    pub signals: SignalInput,
}

/// Load the file named by `data.path`. `trade_type` only matters when the
/// file holds indicator states.
pub fn load_market_csv(
    data: &DataConfig,
    trade_type: TradeType,
) -> Result<LoadedData, LoadError> {
    let file = std::fs::File::open(&data.path).map_err(|source| LoadError::Io {
        path: data.path.clone(),
        source,
    })?;
    let loaded = load_market_from_reader(file, data, trade_type)?;
    debug!(
        path = %data.path.display(),
        bars = loaded.market.len(),
        strategies = loaded.signals.strategy_count(),
        "loaded market data"
    );
    Ok(loaded)
}

/// Load `path` with the column layout of `data`, ignoring `data.path`.
pub fn load_market_csv_at(
    path: &Path,
    data: &DataConfig,
    trade_type: TradeType,
) -> Result<LoadedData, LoadError> {
    let data = DataConfig {
        path: path.to_path_buf(),
        ..data.clone()
    };
    load_market_csv(&data, trade_type)
}

/// Parse CSV content from any reader.
pub fn load_market_from_reader<R: Read>(
    reader: R,
    data: &DataConfig,
    trade_type: TradeType,
) -> Result<LoadedData, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| LoadError::MissingColumn(name.to_string()))
    };

    let ts_idx = column(&data.timestamp_column)?;
    let price_idx = column(&data.price_column)?;
    let signal_cols = data
        .signal_columns()
        .into_iter()
        .map(|cols| {
            let entry_idx = column(&cols.entry)?;
            let exit_idx = column(&cols.exit)?;
            Ok((cols, entry_idx, exit_idx))
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    let mut timestamps = Vec::new();
    let mut prices = Vec::new();
    let mut entries: Vec<Vec<Signal>> = vec![Vec::new(); signal_cols.len()];
    let mut exits: Vec<Vec<Signal>> = vec![Vec::new(); signal_cols.len()];

    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        let row = i + 1;
        let cell = |idx: usize| record.get(idx).unwrap_or("");
        let invalid = |column: &str, value: &str| LoadError::InvalidCell {
            row,
            column: column.to_string(),
            value: value.to_string(),
        };

        let ts_raw = cell(ts_idx);
        timestamps.push(parse_timestamp(ts_raw).ok_or_else(|| invalid(&data.timestamp_column, ts_raw))?);

        let price_raw = cell(price_idx);
        let price = price_raw
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite())
            .ok_or_else(|| invalid(&data.price_column, price_raw))?;
        prices.push(price);

        for (slot, (cols, entry_idx, exit_idx)) in signal_cols.iter().enumerate() {
            let raw = cell(*entry_idx);
            entries[slot].push(parse_signal(raw).ok_or_else(|| invalid(&cols.entry, raw))?);
            let raw = cell(*exit_idx);
            exits[slot].push(parse_signal(raw).ok_or_else(|| invalid(&cols.exit, raw))?);
        }
    }

    let market = MarketData::new(prices, timestamps)?;

    if let Some(mode) = data.signal_mode {
        for (entry, exit) in entries.iter_mut().zip(exits.iter_mut()) {
            let entry_state: Vec<bool> = entry.iter().map(|&v| v == 1).collect();
            let exit_state: Vec<bool> = exit.iter().map(|&v| v == 1).collect();
            (*entry, *exit) = state_to_signals(&entry_state, &exit_state, trade_type, mode);
        }
    }

    let signals = if data.is_multi() {
        let mut entry_map = BTreeMap::new();
        let mut exit_map = BTreeMap::new();
        for ((cols, _, _), (e, x)) in signal_cols.into_iter().zip(entries.into_iter().zip(exits)) {
            entry_map.insert(cols.strategy.clone(), e);
            exit_map.insert(cols.strategy, x);
        }
        SignalInput::Multi {
            entries: entry_map,
            exits: exit_map,
        }
    } else {
        let entries = entries.pop().unwrap_or_default();
        let exits = exits.pop().unwrap_or_default();
        SignalInput::single(entries, exits)
    };

    Ok(LoadedData { market, signals })
}

/// Parse a timestamp cell in any of the accepted formats.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    let epoch: f64 = raw.parse().ok()?;
    if !epoch.is_finite() {
        return None;
    }
    let millis = if epoch > EPOCH_MILLIS_THRESHOLD {
        epoch as i64
    } else {
        (epoch * 1000.0) as i64
    };
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

/// Parse a signal cell: integers, integral floats, booleans, blank as 0.
pub fn parse_signal(raw: &str) -> Option<Signal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0);
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" => return Some(1),
        "false" => return Some(0),
        _ => {}
    }
    if let Ok(v) = raw.parse::<i64>() {
        return Signal::try_from(v).ok();
    }
    let v: f64 = raw.parse().ok()?;
    if v.fract() == 0.0 && v >= Signal::MIN as f64 && v <= Signal::MAX as f64 {
        Some(v as Signal)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::SignalMode;

    #[test]
    fn timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2024-03-01 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-03-01T12:30:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-03-01"),
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("1709296200"), Some(expected));
        assert_eq!(parse_timestamp("1709296200000"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn signal_cells() {
        assert_eq!(parse_signal("1"), Some(1));
        assert_eq!(parse_signal("-1"), Some(-1));
        assert_eq!(parse_signal(""), Some(0));
        assert_eq!(parse_signal("1.0"), Some(1));
        assert_eq!(parse_signal("True"), Some(1));
        assert_eq!(parse_signal("false"), Some(0));
        assert_eq!(parse_signal("0.5"), None);
        assert_eq!(parse_signal("buy"), None);
    }

    #[test]
    fn loads_single_strategy() {
        let csv = "timestamp,close,entry,exit\n\
                   2024-01-01,100.0,1,0\n\
                   2024-01-02,101.5,0,0\n\
                   2024-01-03,103.0,0,-1\n";
        let loaded = load_market_from_reader(
            csv.as_bytes(),
            &DataConfig::new("mem.csv"),
            TradeType::Long,
        )
        .unwrap();
        assert_eq!(loaded.market.len(), 3);
        assert_eq!(loaded.market.prices()[1], 101.5);
        match loaded.signals {
            SignalInput::Single { entries, exits } => {
                assert_eq!(entries, vec![1, 0, 0]);
                assert_eq!(exits, vec![0, 0, -1]);
            }
            other => panic!("expected single input, got {other:?}"),
        }
    }

    #[test]
    fn loads_named_strategies() {
        let csv = "timestamp,close,entry_a,exit_a,entry_b,exit_b\n\
                   2024-01-01,100,1,0,0,0\n\
                   2024-01-02,101,0,-1,1,0\n";
        let data = DataConfig {
            strategies: vec!["a".into(), "b".into()],
            ..DataConfig::new("mem.csv")
        };
        let loaded = load_market_from_reader(csv.as_bytes(), &data, TradeType::Long).unwrap();
        let SignalInput::Multi { entries, exits } = loaded.signals else {
            panic!("expected multi input");
        };
        assert_eq!(entries["b"], vec![0, 1]);
        assert_eq!(exits["a"], vec![0, -1]);
    }

    #[test]
    fn state_columns_become_signals() {
        let csv = "timestamp,close,entry,exit\n\
                   2024-01-01,100,0,0\n\
                   2024-01-02,101,1,0\n\
                   2024-01-03,102,true,0\n\
                   2024-01-04,103,0,1\n\
                   2024-01-05,104,0,1\n";
        let data = DataConfig {
            signal_mode: Some(SignalMode::Cross),
            ..DataConfig::new("mem.csv")
        };

        let loaded = load_market_from_reader(csv.as_bytes(), &data, TradeType::Long).unwrap();
        let SignalInput::Single { entries, exits } = loaded.signals else {
            panic!("expected single input");
        };
        assert_eq!(entries, vec![0, 1, 0, 0, 0]);
        assert_eq!(exits, vec![0, 0, 0, -1, 0]);

        let data = DataConfig {
            signal_mode: Some(SignalMode::Trend),
            ..data
        };
        let loaded = load_market_from_reader(csv.as_bytes(), &data, TradeType::Short).unwrap();
        let SignalInput::Single { entries, exits } = loaded.signals else {
            panic!("expected single input");
        };
        assert_eq!(entries, vec![0, -1, -1, 0, 0]);
        assert_eq!(exits, vec![0, 0, 0, 1, 1]);
    }

    #[test]
    fn missing_column_is_named() {
        let csv = "timestamp,price,entry,exit\n2024-01-01,1,0,0\n";
        let err = load_market_from_reader(
            csv.as_bytes(),
            &DataConfig::new("mem.csv"),
            TradeType::Long,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn(ref c) if c == "close"));
    }

    #[test]
    fn bad_cell_reports_row_and_column() {
        let csv = "timestamp,close,entry,exit\n\
                   2024-01-01,100,0,0\n\
                   2024-01-02,abc,0,0\n";
        let err = load_market_from_reader(
            csv.as_bytes(),
            &DataConfig::new("mem.csv"),
            TradeType::Long,
        )
        .unwrap_err();
        match err {
            LoadError::InvalidCell { row, column, value } => {
                assert_eq!(row, 2);
                assert_eq!(column, "close");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn header_only_file_is_empty_series() {
        let csv = "timestamp,close,entry,exit\n";
        let err = load_market_from_reader(
            csv.as_bytes(),
            &DataConfig::new("mem.csv"),
            TradeType::Long,
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::Engine(EngineError::EmptySeries)));
    }
}
