//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Capital conservation: total == available + position value at every bar
//! 2. Determinism: identical inputs produce identical ledgers and series
//! 3. Position cap: concurrently open positions never exceed max_positions
//! 4. Holding-period gate: signal exits never happen before min_holding_period
//! 5. Fee monotonicity: higher commission never raises a trade's profit

use chrono::{NaiveDate, NaiveDateTime};
use proptest::prelude::*;
use sigbt_core::config::{BacktestConfig, SignalPriority, TradeType};
use sigbt_core::domain::{ExitReason, MarketData, Signal};
use sigbt_core::engine::{simulate, SimulationOutput};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_prices(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec((10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0), len)
}

fn arb_signals(len: usize) -> impl Strategy<Value = Vec<Signal>> {
    prop::collection::vec(prop_oneof![Just(0i8), Just(0i8), Just(1i8), Just(-1i8)], len)
}

fn arb_priority() -> impl Strategy<Value = SignalPriority> {
    prop_oneof![
        Just(SignalPriority::ExitFirst),
        Just(SignalPriority::EntryFirst),
        Just(SignalPriority::SameBarTrade),
    ]
}

fn arb_config() -> impl Strategy<Value = BacktestConfig> {
    (
        arb_priority(),
        0usize..4,
        0usize..4,
        0.0..0.01_f64,
        0.0..0.01_f64,
        0.1..=1.0_f64,
        any::<bool>(),
    )
        .prop_map(
            |(priority, max_positions, min_hold, commission, slippage, size, force_close)| {
                BacktestConfig {
                    trade_type: TradeType::LongShort,
                    signal_priority: priority,
                    max_positions,
                    min_holding_period: min_hold,
                    commission_pct: commission,
                    slippage_pct: slippage,
                    position_size_pct: size,
                    force_close_at_end: force_close,
                    ..BacktestConfig::default()
                }
            },
        )
}

/// Prices plus matching entry and exit signal vectors.
fn arb_inputs() -> impl Strategy<Value = (Vec<f64>, Vec<Signal>, Vec<Signal>)> {
    (2usize..60).prop_flat_map(|n| (arb_prices(n), arb_signals(n), arb_signals(n)))
}

fn stamps(n: usize) -> Vec<NaiveDateTime> {
    let base = NaiveDate::from_ymd_opt(2023, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n).map(|i| base + chrono::Duration::days(i as i64)).collect()
}

fn run(prices: &[f64], entries: &[Signal], exits: &[Signal], config: &BacktestConfig) -> SimulationOutput {
    let market = MarketData::new(prices.to_vec(), stamps(prices.len())).unwrap();
    simulate(&market, entries, exits, config).unwrap()
}

/// Positions open at the end of bar `i`, rebuilt from the ledger.
fn open_at_end_of_bar(out: &SimulationOutput, i: usize) -> usize {
    let closed = out
        .trades
        .iter()
        .filter(|t| t.entry_bar <= i && t.exit_bar > i)
        .count();
    let still_open = out.open_positions.iter().filter(|p| p.entry_bar <= i).count();
    closed + still_open
}

// ── 1. Capital conservation ──────────────────────────────────────────

proptest! {
    #[test]
    fn accounting_identity_holds(
        (prices, entries, exits) in arb_inputs(),
        config in arb_config(),
    ) {
        let out = run(&prices, &entries, &exits, &config);
        prop_assert_eq!(out.series.first_identity_violation(), None);
        prop_assert_eq!(out.series.len(), prices.len());
    }

    /// Quantities are fixed positive amounts for every trade.
    #[test]
    fn quantities_are_positive(
        (prices, entries, exits) in arb_inputs(),
        config in arb_config(),
    ) {
        let out = run(&prices, &entries, &exits, &config);
        for trade in &out.trades {
            prop_assert!(trade.quantity > 0.0);
        }
        for position in &out.open_positions {
            prop_assert!(position.quantity > 0.0);
        }
    }
}

// ── 2. Determinism ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn repeated_runs_are_identical(
        (prices, entries, exits) in arb_inputs(),
        config in arb_config(),
    ) {
        let a = run(&prices, &entries, &exits, &config);
        let b = run(&prices, &entries, &exits, &config);
        prop_assert_eq!(a.trades, b.trades);
        prop_assert_eq!(a.series, b.series);
        prop_assert_eq!(a.open_positions, b.open_positions);
    }
}

// ── 3. Position cap ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn open_positions_respect_cap(
        (prices, entries, exits) in arb_inputs(),
        config in arb_config(),
    ) {
        prop_assume!(config.max_positions > 0);
        let out = run(&prices, &entries, &exits, &config);
        for i in 0..prices.len() {
            prop_assert!(open_at_end_of_bar(&out, i) <= config.max_positions);
        }
    }

    /// Without force close, nothing in the ledger is an end-of-backtest exit.
    #[test]
    fn no_forced_exits_without_force_close(
        (prices, entries, exits) in arb_inputs(),
        config in arb_config(),
    ) {
        let config = BacktestConfig { force_close_at_end: false, ..config };
        let out = run(&prices, &entries, &exits, &config);
        prop_assert!(out.trades.iter().all(|t| t.exit_reason != ExitReason::EndOfBacktest));
    }
}

// ── 4. Holding-period gate ───────────────────────────────────────────

proptest! {
    #[test]
    fn signal_exits_respect_min_holding(
        (prices, entries, exits) in arb_inputs(),
        config in arb_config(),
    ) {
        let out = run(&prices, &entries, &exits, &config);
        for trade in out.trades.iter().filter(|t| t.exit_reason == ExitReason::ExitSignal) {
            prop_assert!(trade.bars_held() >= config.min_holding_period);
        }
    }
}

// ── 5. Fee monotonicity ──────────────────────────────────────────────

proptest! {
    /// One long round trip, same prices, two commission rates.
    #[test]
    fn higher_commission_never_raises_profit(
        entry_price in 10.0..500.0_f64,
        exit_price in 10.0..500.0_f64,
        low in 0.0..0.02_f64,
        bump in 0.0..0.02_f64,
    ) {
        let prices = [entry_price, exit_price];
        let profit_at = |commission: f64| {
            let config = BacktestConfig {
                commission_pct: commission,
                ..BacktestConfig::frictionless(10_000.0)
            };
            run(&prices, &[1, 0], &[0, -1], &config).trades[0].profit
        };
        prop_assert!(profit_at(low + bump) <= profit_at(low) + 1e-9);
    }
}
