//! Performance metrics: pure functions that compute strategy statistics.
//!
//! Every metric is a pure function of the capital series and/or the closed
//! trade ledger. Degenerate inputs (no trades, flat equity, no losses) map to
//! fixed sentinel values instead of errors.
//!
//! Returns and drawdowns are reported in percent; ratios are plain numbers.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use sigbt_core::config::BacktestConfig;
use sigbt_core::domain::{ClosedTrade, TimeSeriesStore};

/// Sentinel for Sortino and Calmar when the denominator vanishes but the
/// numerator is positive.
pub const RATIO_CAP: f64 = 100.0;

/// Maximum number of points kept in [`PerformanceMetrics::equity_curve`].
pub const EQUITY_CURVE_POINTS: usize = 1000;

/// One sample of the down-sampled equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub total_capital: f64,
}

/// Aggregate performance metrics for a single strategy run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub start_value: f64,
    pub end_value: f64,
    /// Percent.
    pub total_return: f64,
    /// Percent.
    pub annualized_return: f64,
    /// Percent, positive.
    pub max_drawdown: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    /// Percent.
    pub win_rate: f64,
    pub profit_factor: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub equity_curve: Vec<EquityPoint>,
}

impl PerformanceMetrics {
    /// Compute every metric from a finished run.
    pub fn compute(
        series: &TimeSeriesStore,
        trades: &[ClosedTrade],
        config: &BacktestConfig,
    ) -> Self {
        let periods_per_year = config.periods_per_year();
        let start_value = config.initial_capital;
        let end_value = series.final_total().unwrap_or(start_value);
        let total = total_return(start_value, end_value);
        let annualized = annualized_return(total, series.len(), periods_per_year);
        let max_dd = max_drawdown(&series.total_capital);

        Self {
            start_value,
            end_value,
            total_return: total,
            annualized_return: annualized,
            max_drawdown: max_dd,
            total_trades: trades.len(),
            winning_trades: winning_trades(trades),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            sharpe_ratio: sharpe_ratio(&series.period_return, config.risk_free_rate, periods_per_year),
            sortino_ratio: sortino_ratio(
                &series.period_return,
                config.risk_free_rate,
                periods_per_year,
            ),
            calmar_ratio: calmar_ratio(annualized, max_dd),
            equity_curve: equity_curve(&series.timestamps, &series.total_capital),
        }
    }
}

// ─── Return metrics ─────────────────────────────────────────────────

/// Total return in percent: `(end / start - 1) * 100`.
pub fn total_return(start_value: f64, end_value: f64) -> f64 {
    if start_value <= 0.0 {
        return 0.0;
    }
    (end_value / start_value - 1.0) * 100.0
}

/// Compound annualized return in percent.
///
/// `years = bar_count / periods_per_year`. Zero when the total return is zero
/// or the span is empty. A total loss of 100% or more annualizes to -100%.
pub fn annualized_return(total_return_pct: f64, bar_count: usize, periods_per_year: u32) -> f64 {
    if total_return_pct == 0.0 || periods_per_year == 0 {
        return 0.0;
    }
    let years = bar_count as f64 / periods_per_year as f64;
    if years <= 0.0 {
        return 0.0;
    }
    let growth = 1.0 + total_return_pct / 100.0;
    if growth <= 0.0 {
        return -100.0;
    }
    (growth.powf(1.0 / years) - 1.0) * 100.0
}

/// Largest peak-to-trough decline of the series, in percent (positive).
pub fn max_drawdown(total_capital: &[f64]) -> f64 {
    let Some(&first) = total_capital.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut max_dd = 0.0_f64;

    for &value in &total_capital[1..] {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            let dd = (peak - value) / peak * 100.0;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

// ─── Trade metrics ──────────────────────────────────────────────────

pub fn winning_trades(trades: &[ClosedTrade]) -> usize {
    trades.iter().filter(|t| t.is_winner()).count()
}

/// Percent of trades with positive profit. Zero with no trades.
pub fn win_rate(trades: &[ClosedTrade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    winning_trades(trades) as f64 / trades.len() as f64 * 100.0
}

/// Gross profit over gross loss. Zero when there are no losses.
pub fn profit_factor(trades: &[ClosedTrade]) -> f64 {
    let gross_profit: f64 = trades
        .iter()
        .filter(|t| t.profit > 0.0)
        .map(|t| t.profit)
        .sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.profit <= 0.0)
        .map(|t| t.profit.abs())
        .sum();

    if gross_loss == 0.0 {
        return 0.0;
    }
    gross_profit / gross_loss
}

// ─── Risk-adjusted ratios ───────────────────────────────────────────

/// Per-period equivalent of an annual rate, compounded.
pub fn per_period_rate(annual_rate: f64, periods_per_year: u32) -> f64 {
    if periods_per_year == 0 {
        return 0.0;
    }
    (1.0 + annual_rate).powf(1.0 / periods_per_year as f64) - 1.0
}

/// Period returns minus the per-period risk-free rate, NaN entries dropped.
fn excess_returns(period_returns: &[f64], risk_free_rate: f64, periods_per_year: u32) -> Vec<f64> {
    let rf = per_period_rate(risk_free_rate, periods_per_year);
    period_returns
        .iter()
        .filter(|r| !r.is_nan())
        .map(|r| r - rf)
        .collect()
}

/// Annualized Sharpe ratio.
///
/// `mean(excess) / std(excess) * sqrt(periods_per_year)` with population
/// standard deviation. Zero with no valid returns or near-zero deviation.
pub fn sharpe_ratio(period_returns: &[f64], risk_free_rate: f64, periods_per_year: u32) -> f64 {
    let excess = excess_returns(period_returns, risk_free_rate, periods_per_year);
    if excess.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(&excess);
    let std = std_dev(&excess, mean);
    if std <= f64::EPSILON {
        return 0.0;
    }
    mean / std * (periods_per_year as f64).sqrt()
}

/// Annualized Sortino ratio.
///
/// Downside deviation is the RMS of the negative excess returns only. With no
/// downside the ratio is [`RATIO_CAP`] for a positive mean and zero otherwise.
pub fn sortino_ratio(period_returns: &[f64], risk_free_rate: f64, periods_per_year: u32) -> f64 {
    let excess = excess_returns(period_returns, risk_free_rate, periods_per_year);
    if excess.is_empty() {
        return 0.0;
    }
    let mean = mean_f64(&excess);

    let (sum_sq, count) = excess
        .iter()
        .filter(|&&r| r < 0.0)
        .fold((0.0, 0usize), |(s, n), r| (s + r * r, n + 1));

    if count == 0 || sum_sq <= f64::EPSILON {
        return if mean > 0.0 { RATIO_CAP } else { 0.0 };
    }
    let downside = (sum_sq / count as f64).sqrt();
    mean / downside * (periods_per_year as f64).sqrt()
}

/// Annualized return over max drawdown (both in percent).
///
/// Below 0.01% drawdown the ratio is [`RATIO_CAP`] for a positive annualized
/// return and zero otherwise.
pub fn calmar_ratio(annualized_return_pct: f64, max_drawdown_pct: f64) -> f64 {
    if max_drawdown_pct < 0.01 {
        return if annualized_return_pct > 0.0 {
            RATIO_CAP
        } else {
            0.0
        };
    }
    annualized_return_pct / max_drawdown_pct
}

// ─── Equity curve ───────────────────────────────────────────────────

/// Down-sample the total-capital series to roughly
/// [`EQUITY_CURVE_POINTS`] points with stride `max(1, len / 1000)`.
pub fn equity_curve(timestamps: &[NaiveDateTime], total_capital: &[f64]) -> Vec<EquityPoint> {
    let len = total_capital.len().min(timestamps.len());
    let stride = (len / EQUITY_CURVE_POINTS).max(1);
    (0..len)
        .step_by(stride)
        .map(|i| EquityPoint {
            timestamp: timestamps[i],
            total_capital: total_capital[i],
        })
        .collect()
}

// ─── Helpers ────────────────────────────────────────────────────────

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}
