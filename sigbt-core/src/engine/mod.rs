//! Simulation engine: the signal processor and the rules it applies.
//!
//! Per bar the processor runs three phases:
//!
//! 1. Mark-to-market: revalue every open position at the bar's price
//! 2. Dispatch: exits and entries in the configured priority order
//! 3. Accounting: record available capital, position value, total capital

pub mod cost_model;
pub mod exit_rules;
pub mod processor;

pub use cost_model::{CostModel, EntryFill};
pub use exit_rules::ExitRules;
pub use processor::{simulate, validate_signals, SignalProcessor, SimulationOutput};
