//! Market input: aligned price and timestamp arrays shared by every
//! strategy in a run.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Ordered bars: `prices[i]` was observed at `timestamps[i]`.
///
/// Deserialization goes through [`MarketData::new`], so a decoded value is
/// never empty or misaligned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMarketData")]
pub struct MarketData {
    prices: Vec<f64>,
    timestamps: Vec<NaiveDateTime>,
}

#[derive(Deserialize)]
struct RawMarketData {
    prices: Vec<f64>,
    timestamps: Vec<NaiveDateTime>,
}

impl TryFrom<RawMarketData> for MarketData {
    type Error = EngineError;

    fn try_from(raw: RawMarketData) -> Result<Self, Self::Error> {
        MarketData::new(raw.prices, raw.timestamps)
    }
}

impl MarketData {
    /// Build market data, rejecting empty or misaligned arrays.
    pub fn new(prices: Vec<f64>, timestamps: Vec<NaiveDateTime>) -> Result<Self, EngineError> {
        if prices.len() != timestamps.len() {
            return Err(EngineError::MarketLengthMismatch {
                prices: prices.len(),
                timestamps: timestamps.len(),
            });
        }
        if prices.is_empty() {
            return Err(EngineError::EmptySeries);
        }
        Ok(Self { prices, timestamps })
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn last_index(&self) -> usize {
        self.prices.len() - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamps(n: usize) -> Vec<NaiveDateTime> {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n).map(|i| base + chrono::Duration::days(i as i64)).collect()
    }

    #[test]
    fn accepts_aligned_arrays() {
        let market = MarketData::new(vec![1.0, 2.0, 3.0], stamps(3)).unwrap();
        assert_eq!(market.len(), 3);
        assert_eq!(market.last_index(), 2);
    }

    #[test]
    fn rejects_length_mismatch() {
        let err = MarketData::new(vec![1.0, 2.0], stamps(3)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::MarketLengthMismatch {
                prices: 2,
                timestamps: 3
            }
        ));
    }

    #[test]
    fn rejects_empty() {
        let err = MarketData::new(vec![], vec![]).unwrap_err();
        assert!(matches!(err, EngineError::EmptySeries));
    }

    #[test]
    fn deserialize_round_trips_valid_data() {
        let market = MarketData::new(vec![1.0, 2.0], stamps(2)).unwrap();
        let json = serde_json::to_string(&market).unwrap();
        let back: MarketData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, market);
    }

    #[test]
    fn deserialize_rejects_empty_series() {
        let err = serde_json::from_str::<MarketData>(r#"{"prices":[],"timestamps":[]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("input series are empty"));
    }

    #[test]
    fn deserialize_rejects_misaligned_arrays() {
        let json = r#"{"prices":[1.0,2.0],"timestamps":["2024-01-01T00:00:00"]}"#;
        let err = serde_json::from_str::<MarketData>(json).unwrap_err();
        assert!(err.to_string().contains("must have the same length"));
    }
}
