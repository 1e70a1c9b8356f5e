//! Domain types: market input, open positions, closed trades, and the
//! per-bar capital series.

pub mod market;
pub mod position;
pub mod series;
pub mod trade;

pub use market::MarketData;
pub use position::{OpenPosition, PositionSide};
pub use series::TimeSeriesStore;
pub use trade::{ClosedTrade, ExitReason};

/// Strategy key used when a run has a single signal pair.
pub const DEFAULT_STRATEGY: &str = "default";

/// Per-bar trading instruction: `1`, `-1`, or `0` (anything else is ignored).
pub type Signal = i8;
