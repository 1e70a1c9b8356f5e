//! Cost model: slippage and commission arithmetic for entries and exits.
//!
//! Slippage is always adverse: long entries and short exits fill above the
//! market, long exits and short entries fill below it. Commission is a
//! fraction of traded value and is never a gain.

use crate::domain::trade::ExitFill;
use crate::domain::{OpenPosition, PositionSide};

/// Result of sizing and pricing an entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryFill {
    pub price: f64,
    pub fee: f64,
    pub quantity: f64,
    /// Capital actually converted into the position (`trade_amount - fee`).
    pub invested: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CostModel {
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

impl CostModel {
    pub fn new(commission_pct: f64, slippage_pct: f64) -> Self {
        Self {
            commission_pct,
            slippage_pct,
        }
    }

    #[cfg(test)]
    pub fn frictionless() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn entry_price(&self, market_price: f64, side: PositionSide) -> f64 {
        match side {
            PositionSide::Long => market_price * (1.0 + self.slippage_pct),
            PositionSide::Short => market_price * (1.0 - self.slippage_pct),
        }
    }

    pub fn exit_price(&self, market_price: f64, side: PositionSide) -> f64 {
        match side {
            PositionSide::Long => market_price * (1.0 - self.slippage_pct),
            PositionSide::Short => market_price * (1.0 + self.slippage_pct),
        }
    }

    /// Price an entry committing `trade_amount` of capital, fee included.
    ///
    /// `fee = trade_amount * commission`, `quantity = (trade_amount - fee) / fill_price`.
    pub fn entry_fill(&self, trade_amount: f64, market_price: f64, side: PositionSide) -> EntryFill {
        let price = self.entry_price(market_price, side);
        let fee = trade_amount * self.commission_pct;
        let invested = trade_amount - fee;
        EntryFill {
            price,
            fee,
            quantity: invested / price,
            invested,
        }
    }

    /// Settle the exit of `position` at `market_price`.
    ///
    /// Long: value = `qty * price * (1 - commission)`, profit = value - investment.
    /// Short: buyback = `qty * price`, fee = buyback * commission,
    /// profit = investment - (buyback + fee), value = investment + profit.
    pub fn exit_fill(&self, position: &OpenPosition, market_price: f64) -> ExitFill {
        let price = self.exit_price(market_price, position.side);
        let gross = position.quantity * price;
        let fee = gross * self.commission_pct;
        match position.side {
            PositionSide::Long => {
                let value = gross * (1.0 - self.commission_pct);
                ExitFill {
                    price,
                    fee,
                    value,
                    profit: value - position.entry_investment,
                }
            }
            PositionSide::Short => {
                let profit = position.entry_investment - (gross + fee);
                ExitFill {
                    price,
                    fee,
                    value: position.entry_investment + profit,
                    profit,
                }
            }
        }
    }
}
