//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: trade ledger, down-sampled equity curve, account statement,
//!   and a full per-bar record joining prices, signals, capital, and account
//! - **Markdown**: single-run reports and a multi-strategy comparison table
//!
//! All persisted artifacts include a `schema_version` field. Newer versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sigbt_core::domain::ClosedTrade;

use crate::account::{reconstruct_account, AccountReport, AccountRow};
use crate::metrics::EquityPoint;
use crate::result::{BacktestResult, SCHEMA_VERSION};

/// Timestamp format used in every CSV export.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the closed-trade ledger as CSV.
pub fn export_trades_csv(trades: &[ClosedTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "entry_time",
        "exit_time",
        "side",
        "entry_price",
        "exit_price",
        "quantity",
        "entry_fee",
        "exit_fee",
        "investment",
        "exit_value",
        "profit",
        "profit_pct",
        "bars_held",
        "exit_reason",
    ])?;

    for t in trades {
        wtr.write_record([
            t.entry_time.format(TIMESTAMP_FORMAT).to_string(),
            t.exit_time.format(TIMESTAMP_FORMAT).to_string(),
            t.side.to_string(),
            format!("{:.6}", t.entry_price),
            format!("{:.6}", t.exit_price),
            format!("{:.6}", t.quantity),
            format!("{:.2}", t.entry_fee),
            format!("{:.2}", t.exit_fee),
            format!("{:.2}", t.entry_investment),
            format!("{:.2}", t.exit_value),
            format!("{:.2}", t.profit),
            format!("{:.2}", t.profit_pct),
            t.bars_held().to_string(),
            t.exit_reason.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export the down-sampled equity curve as CSV.
pub fn export_equity_csv(curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "total_capital"])?;
    for point in curve {
        wtr.write_record([
            point.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.2}", point.total_capital),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Export an account statement as CSV, followed by a summary block.
pub fn export_account_csv(report: &AccountReport) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "Date",
        "Price",
        "Balance",
        "Position Value",
        "Total Value",
        "Profit/Loss",
        "Cumulative Return (%)",
        "Drawdown (%)",
        "Active Trades",
    ])?;
    for row in &report.rows {
        wtr.write_record([
            row.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.2}", row.price),
            format!("{:.2}", row.balance),
            format!("{:.2}", row.position_value),
            format!("{:.2}", row.total_value),
            format!("{:.2}", row.profit_loss),
            format!("{:.2}", row.cumulative_return),
            format!("{:.2}", row.drawdown),
            row.active_trades.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    let mut out = String::from_utf8(data).context("CSV output is not valid UTF-8")?;

    let s = &report.summary;
    let mut summary = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(vec![]);
    summary.write_record(["Summary Statistics"])?;
    for (label, value) in [
        ("Initial Capital", format!("{:.2}", s.initial_capital)),
        ("Final Value", format!("{:.2}", s.final_value)),
        ("Total Return (%)", format!("{:.2}", s.total_return)),
        ("Max Drawdown (%)", format!("{:.2}", s.max_drawdown)),
        ("Total Trades", s.total_trades.to_string()),
        ("Total Data Points", s.data_points.to_string()),
    ] {
        summary.write_record([label, value.as_str()])?;
    }
    let data = summary.into_inner().context("failed to flush CSV writer")?;

    out.push('\n');
    out.push_str(&String::from_utf8(data).context("CSV output is not valid UTF-8")?);
    Ok(out)
}

/// Export one row per bar: price, signals, the engine's capital series, and
/// the account statement columns (blank when the run closed no trades),
/// followed by a performance summary block.
pub fn export_series_csv(result: &BacktestResult) -> Result<String> {
    let series = &result.series;
    let account = reconstruct_account(result);
    let account_rows: &[AccountRow] = account.as_ref().map_or(&[], |r| r.rows.as_slice());
    let money = |v: Option<f64>| v.map(|v| format!("{v:.2}")).unwrap_or_default();

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        "price",
        "entry_signal",
        "exit_signal",
        "available_capital",
        "position_value",
        "total_capital",
        "period_return",
        "cumulative_return",
        "account_balance",
        "account_position_value",
        "account_total_value",
        "profit_loss",
        "drawdown",
        "active_trades",
    ])?;

    for i in 0..series.len() {
        let row = account_rows.get(i);
        wtr.write_record([
            series.timestamps[i].format(TIMESTAMP_FORMAT).to_string(),
            format!("{:.6}", result.prices.get(i).copied().unwrap_or_default()),
            result.entries.get(i).copied().unwrap_or(0).to_string(),
            result.exits.get(i).copied().unwrap_or(0).to_string(),
            format!("{:.2}", series.available_capital[i]),
            format!("{:.2}", series.position_value[i]),
            format!("{:.2}", series.total_capital[i]),
            format!("{:.6}", series.period_return[i]),
            format!("{:.4}", series.cumulative_return[i]),
            money(row.map(|r| r.balance)),
            money(row.map(|r| r.position_value)),
            money(row.map(|r| r.total_value)),
            money(row.map(|r| r.profit_loss)),
            money(row.map(|r| r.drawdown)),
            row.map(|r| r.active_trades.to_string()).unwrap_or_default(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    let mut out = String::from_utf8(data).context("CSV output is not valid UTF-8")?;

    let m = &result.metrics;
    let mut summary = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(vec![]);
    summary.write_record(["Performance Summary"])?;
    for (label, value) in [
        ("Start Value", format!("{:.2}", m.start_value)),
        ("End Value", format!("{:.2}", m.end_value)),
        ("Total Return (%)", format!("{:.2}", m.total_return)),
        ("Annualized Return (%)", format!("{:.2}", m.annualized_return)),
        ("Max Drawdown (%)", format!("{:.2}", m.max_drawdown)),
        ("Total Trades", m.total_trades.to_string()),
        ("Win Rate (%)", format!("{:.2}", m.win_rate)),
        ("Profit Factor", format!("{:.2}", m.profit_factor)),
        ("Sharpe Ratio", format!("{:.2}", m.sharpe_ratio)),
    ] {
        summary.write_record([label, value.as_str()])?;
    }
    let data = summary.into_inner().context("failed to flush CSV writer")?;

    out.push('\n');
    out.push_str(&String::from_utf8(data).context("CSV output is not valid UTF-8")?);
    Ok(out)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one strategy result.
///
/// Creates `{strategy}_{run_id prefix}/` under `output_dir` containing:
/// - `result.json`: the full `BacktestResult`
/// - `trades.csv`: closed-trade ledger
/// - `equity.csv`: down-sampled equity curve
/// - `series.csv`: full per-bar record
/// - `account_details.csv`: account statement (only when trades exist)
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let dirname = format!("{}_{}", result.strategy, result.short_id());
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(result)?;
    std::fs::write(run_dir.join("result.json"), &json)?;

    let trades_csv = export_trades_csv(&result.trades)?;
    std::fs::write(run_dir.join("trades.csv"), &trades_csv)?;

    let equity_csv = export_equity_csv(&result.metrics.equity_curve)?;
    std::fs::write(run_dir.join("equity.csv"), &equity_csv)?;

    let series_csv = export_series_csv(result)?;
    std::fs::write(run_dir.join("series.csv"), &series_csv)?;

    if let Some(report) = reconstruct_account(result) {
        let account_csv = export_account_csv(&report)?;
        std::fs::write(run_dir.join("account_details.csv"), &account_csv)?;
    }

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's result.json.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for a single strategy result.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    let c = &result.config;

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Run\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Strategy | {} |\n", result.strategy));
    md.push_str(&format!("| Run ID | {} |\n", result.short_id()));
    if let (Some(first), Some(last)) = (result.timestamps().first(), result.timestamps().last()) {
        md.push_str(&format!(
            "| Period | {} to {} |\n",
            first.format(TIMESTAMP_FORMAT),
            last.format(TIMESTAMP_FORMAT)
        ));
    }
    md.push_str(&format!("| Bars | {} |\n", result.series.len()));
    md.push_str(&format!("| Timeframe | {} |\n", c.timeframe));
    md.push_str(&format!("| Trade Type | {} |\n", c.trade_type));
    md.push_str(&format!("| Signal Priority | {} |\n", c.signal_priority));
    md.push_str(&format!("| Initial Capital | {:.2} |\n", c.initial_capital));
    md.push_str(&format!(
        "| Position Size | {:.1}% |\n",
        c.position_size_pct * 100.0
    ));
    md.push_str(&format!(
        "| Commission / Slippage | {:.3}% / {:.3}% |\n",
        c.commission_pct * 100.0,
        c.slippage_pct * 100.0
    ));
    md.push('\n');

    let m = &result.metrics;
    md.push_str("## Performance Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Start Value | {:.2} |\n", m.start_value));
    md.push_str(&format!("| End Value | {:.2} |\n", m.end_value));
    md.push_str(&format!("| Total Return | {:.2}% |\n", m.total_return));
    md.push_str(&format!(
        "| Annualized Return | {:.2}% |\n",
        m.annualized_return
    ));
    md.push_str(&format!("| Max Drawdown | {:.2}% |\n", m.max_drawdown));
    md.push_str(&format!("| Sharpe | {:.3} |\n", m.sharpe_ratio));
    md.push_str(&format!("| Sortino | {:.3} |\n", m.sortino_ratio));
    md.push_str(&format!("| Calmar | {:.3} |\n", m.calmar_ratio));
    md.push_str(&format!("| Trades | {} |\n", m.total_trades));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", m.win_rate));
    md.push_str(&format!("| Profit Factor | {:.2} |\n", m.profit_factor));
    md.push('\n');

    if !result.trades.is_empty() {
        md.push_str("## Exit Reasons\n\n");
        md.push_str("| Reason | Trades |\n");
        md.push_str("| --- | --- |\n");
        let mut counts: Vec<(&'static str, usize)> = Vec::new();
        for t in &result.trades {
            let label = t.exit_reason.label();
            match counts.iter_mut().find(|(l, _)| *l == label) {
                Some((_, n)) => *n += 1,
                None => counts.push((label, 1)),
            }
        }
        for (label, n) in counts {
            md.push_str(&format!("| {label} | {n} |\n"));
        }
        md.push('\n');
    }

    if !result.open_positions.is_empty() {
        md.push_str("## Open Positions\n\n");
        md.push_str(&format!(
            "{} position(s) still open at the final bar, not counted in trade statistics.\n\n",
            result.open_positions.len()
        ));
        md.push_str("| Side | Entry | Entry Price | Quantity | Value |\n");
        md.push_str("| --- | --- | --- | --- | --- |\n");
        for p in &result.open_positions {
            md.push_str(&format!(
                "| {} | {} | {:.4} | {:.4} | {:.2} |\n",
                p.side,
                p.entry_time.format(TIMESTAMP_FORMAT),
                p.entry_price,
                p.quantity,
                p.current_value
            ));
        }
        md.push('\n');
    }

    md
}

/// Generate a Markdown comparison table across strategy results.
pub fn generate_comparison(results: &[&BacktestResult]) -> String {
    let mut md = String::with_capacity(1024);

    md.push_str("# Strategy Comparison\n\n");
    md.push_str(
        "| Strategy | Total Return | Annualized | Max DD | Sharpe | Sortino | Calmar | Trades | Win Rate | Profit Factor |\n",
    );
    md.push_str("| --- | --- | --- | --- | --- | --- | --- | --- | --- | --- |\n");
    for r in results {
        let m = &r.metrics;
        md.push_str(&format!(
            "| {} | {:.2}% | {:.2}% | {:.2}% | {:.3} | {:.3} | {:.3} | {} | {:.1}% | {:.2} |\n",
            r.strategy,
            m.total_return,
            m.annualized_return,
            m.max_drawdown,
            m.sharpe_ratio,
            m.sortino_ratio,
            m.calmar_ratio,
            m.total_trades,
            m.win_rate,
            m.profit_factor,
        ));
    }

    if let Some(best) = results.iter().max_by(|a, b| {
        a.metrics
            .sharpe_ratio
            .total_cmp(&b.metrics.sharpe_ratio)
    }) {
        md.push_str(&format!("\nBest Sharpe: **{}**\n", best.strategy));
    }

    md
}
