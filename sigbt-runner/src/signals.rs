//! Signal generation from indicator state series.
//!
//! Indicator pipelines usually emit boolean states ("fast MA above slow MA")
//! rather than `+1/-1/0` instructions. [`state_to_signals`] turns an entry
//! state and an exit state into the signal pair the engine consumes.
//!
//! | Trade type   | entry state       | exit state        |
//! |--------------|-------------------|-------------------|
//! | `long`       | entry `+1`        | exit `-1`         |
//! | `short`      | entry `-1`        | exit `+1`         |
//! | `long_short` | entry `+1`, exit `+1` | entry `-1`, exit `-1` |
//!
//! In `long_short` mode a bar where both states are active gets entry `-1`
//! and exit `+1`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sigbt_core::config::TradeType;
use sigbt_core::domain::Signal;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown signal mode '{0}' (expected trend or cross)")]
pub struct UnknownSignalMode(pub String);

/// How a state series becomes a trigger series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalMode {
    /// Every bar the state is active carries a signal.
    #[default]
    Trend,
    /// Only the bar where the state turns active carries a signal.
    Cross,
}

impl SignalMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalMode::Trend => "trend",
            SignalMode::Cross => "cross",
        }
    }

    fn triggers(self, state: &[bool]) -> Vec<bool> {
        match self {
            SignalMode::Trend => state.to_vec(),
            SignalMode::Cross => crossings(state),
        }
    }
}

impl FromStr for SignalMode {
    type Err = UnknownSignalMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trend" => Ok(SignalMode::Trend),
            "cross" => Ok(SignalMode::Cross),
            _ => Err(UnknownSignalMode(s.to_string())),
        }
    }
}

impl fmt::Display for SignalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bars where `state` switches from inactive to active. Bar 0 never counts.
pub fn crossings(state: &[bool]) -> Vec<bool> {
    state
        .iter()
        .enumerate()
        .map(|(i, &on)| on && i > 0 && !state[i - 1])
        .collect()
}

/// Build `(entries, exits)` from entry and exit state series.
///
/// The output length is the longer of the two inputs; missing bars of the
/// shorter one count as inactive.
pub fn state_to_signals(
    entry_state: &[bool],
    exit_state: &[bool],
    trade_type: TradeType,
    mode: SignalMode,
) -> (Vec<Signal>, Vec<Signal>) {
    let n = entry_state.len().max(exit_state.len());
    let entry_on = mode.triggers(entry_state);
    let exit_on = mode.triggers(exit_state);
    let at = |v: &[bool], i: usize| v.get(i).copied().unwrap_or(false);

    let mut entries = vec![0; n];
    let mut exits = vec![0; n];
    for i in 0..n {
        let (e, x) = (at(&entry_on, i), at(&exit_on, i));
        (entries[i], exits[i]) = match trade_type {
            TradeType::Long => (if e { 1 } else { 0 }, if x { -1 } else { 0 }),
            TradeType::Short => (if e { -1 } else { 0 }, if x { 1 } else { 0 }),
            TradeType::LongShort => {
                let entry = if x { -1 } else if e { 1 } else { 0 };
                let exit = if e { 1 } else if x { -1 } else { 0 };
                (entry, exit)
            }
        };
    }
    (entries, exits)
}
