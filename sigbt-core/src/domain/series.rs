//! TimeSeriesStore: per-bar capital accounting for one simulation.
//!
//! The accounting identity must hold at every bar:
//! `total_capital[i] == available_capital[i] + position_value[i]`.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Aligned per-bar capital series, owned by a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesStore {
    pub timestamps: Vec<NaiveDateTime>,
    /// Uninvested capital after the bar's transactions.
    pub available_capital: Vec<f64>,
    /// Aggregate mark-to-market value of open positions.
    pub position_value: Vec<f64>,
    pub total_capital: Vec<f64>,
    /// `total[i] / total[i-1] - 1`; zero at bar 0.
    pub period_return: Vec<f64>,
    /// Compounded return in percent.
    pub cumulative_return: Vec<f64>,
}

impl TimeSeriesStore {
    /// Allocate buffers for `timestamps.len()` bars, seeded with the
    /// starting capital.
    pub fn new(timestamps: &[NaiveDateTime], initial_capital: f64) -> Self {
        let n = timestamps.len();
        Self {
            timestamps: timestamps.to_vec(),
            available_capital: vec![initial_capital; n],
            position_value: vec![0.0; n],
            total_capital: vec![initial_capital; n],
            period_return: vec![0.0; n],
            cumulative_return: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.total_capital.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_capital.is_empty()
    }

    /// Write bar `i`'s capital state and its period return.
    ///
    /// The period return stays zero when the previous total is non-positive.
    pub fn record_bar(&mut self, i: usize, available: f64, position_value: f64) {
        self.available_capital[i] = available;
        self.position_value[i] = position_value;
        self.total_capital[i] = available + position_value;

        self.period_return[i] = 0.0;
        if i > 0 {
            let prev = self.total_capital[i - 1];
            if prev > 0.0 {
                self.period_return[i] = self.total_capital[i] / prev - 1.0;
            }
        }
    }

    /// Compound the period returns into `cumulative_return` (percent).
    pub fn finalize_cumulative(&mut self) {
        let mut growth = 1.0;
        for (cum, r) in self.cumulative_return.iter_mut().zip(&self.period_return) {
            growth *= 1.0 + r;
            *cum = (growth - 1.0) * 100.0;
        }
    }

    pub fn final_total(&self) -> Option<f64> {
        self.total_capital.last().copied()
    }

    /// Index of the first bar where the accounting identity fails, if any.
    pub fn first_identity_violation(&self) -> Option<usize> {
        (0..self.len()).find(|&i| {
            self.total_capital[i] != self.available_capital[i] + self.position_value[i]
        })
    }
}
