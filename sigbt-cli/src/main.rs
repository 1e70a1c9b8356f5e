//! sigbt CLI: run signal backtests from a TOML config and render reports.
//!
//! Commands:
//! - `run`: load market data and signals, simulate, print a summary, save artifacts
//! - `report`: render a Markdown report from a saved artifact directory or result JSON

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sigbt_runner::data_loader::load_market_csv_at;
use sigbt_runner::{
    generate_comparison, generate_report, import_json, load_artifacts, load_market_csv,
    save_artifacts, Backtest, BacktestResult, RunConfig,
};

#[derive(Parser)]
#[command(name = "sigbt", about = "sigbt: signal-driven backtest simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest described by a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// CSV file to use instead of the config's `data.path`.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Skip writing artifacts.
        #[arg(long, default_value_t = false)]
        no_artifacts: bool,

        /// Print the full Markdown report for each strategy.
        #[arg(long, default_value_t = false)]
        report: bool,
    },
    /// Render a Markdown report from saved results.
    Report {
        /// Artifact directories or result JSON files. Two or more produce a comparison table.
        #[arg(required = true)]
        results: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data,
            output_dir,
            no_artifacts,
            report,
        } => run_backtest_cmd(&config, data.as_deref(), &output_dir, no_artifacts, report),
        Commands::Report { results } => run_report_cmd(&results),
    }
}

fn run_backtest_cmd(
    config_path: &Path,
    data_override: Option<&Path>,
    output_dir: &Path,
    no_artifacts: bool,
    report: bool,
) -> Result<()> {
    let run_config = RunConfig::from_file(config_path)
        .with_context(|| format!("loading config {}", config_path.display()))?;

    let trade_type = run_config.backtest.trade_type;
    let loaded = match data_override {
        Some(path) => load_market_csv_at(path, &run_config.data, trade_type)?,
        None => load_market_csv(&run_config.data, trade_type)?,
    };
    info!(
        bars = loaded.market.len(),
        strategies = loaded.signals.strategy_count(),
        "market data loaded"
    );

    let backtest = Backtest::new(loaded.market, loaded.signals, run_config.backtest)?;
    let outcome = backtest.run()?;
    let results = outcome.results();

    for result in &results {
        print_summary(result);
        if report {
            println!();
            println!("{}", generate_report(result));
        }
    }

    if results.len() > 1 {
        println!();
        println!("{}", generate_comparison(&results));
    }

    if !no_artifacts {
        for result in &results {
            let run_dir = save_artifacts(result, output_dir)?;
            println!("Artifacts saved to: {}", run_dir.display());
        }
    }

    Ok(())
}

fn run_report_cmd(paths: &[PathBuf]) -> Result<()> {
    let results = paths
        .iter()
        .map(|p| load_result(p))
        .collect::<Result<Vec<_>>>()?;

    if let [single] = results.as_slice() {
        println!("{}", generate_report(single));
    } else {
        let refs: Vec<&BacktestResult> = results.iter().collect();
        println!("{}", generate_comparison(&refs));
    }
    Ok(())
}

fn load_result(path: &Path) -> Result<BacktestResult> {
    if path.is_dir() {
        return load_artifacts(path);
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    import_json(&json)
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    println!();
    println!("=== Backtest Result ===");
    println!("Strategy:       {}", result.strategy);
    println!("Run ID:         {}", result.short_id());
    if let (Some(first), Some(last)) = (result.timestamps().first(), result.timestamps().last()) {
        println!("Period:         {first} to {last}");
    }
    println!("Bars:           {}", result.series.len());
    println!("Trades:         {}", m.total_trades);
    if !result.open_positions.is_empty() {
        println!("Open at end:    {}", result.open_positions.len());
    }
    println!();
    println!("--- Performance ---");
    println!("Start Value:    {:.2}", m.start_value);
    println!("End Value:      {:.2}", m.end_value);
    println!("Total Return:   {:.2}%", m.total_return);
    println!("Annualized:     {:.2}%", m.annualized_return);
    println!("Max Drawdown:   {:.2}%", m.max_drawdown);
    println!("Sharpe:         {:.3}", m.sharpe_ratio);
    println!("Sortino:        {:.3}", m.sortino_ratio);
    println!("Calmar:         {:.3}", m.calmar_ratio);
    println!("Win Rate:       {:.1}%", m.win_rate);
    println!("Profit Factor:  {:.2}", m.profit_factor);
}
