//! Fee schedule
//!
//! Fees are derived per trade: quantity × price × rate. Rates are
//! engine configuration; the maker rate may be negative (rebate).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maker/taker fee rates applied to trade notional value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub maker_rate: Decimal,
    pub taker_rate: Decimal,
}

impl FeeSchedule {
    pub fn new(maker_rate: Decimal, taker_rate: Decimal) -> Self {
        Self {
            maker_rate,
            taker_rate,
        }
    }

    /// Fee charged to the resting side
    pub fn maker_fee(&self, trade_value: Decimal) -> Decimal {
        trade_value * self.maker_rate
    }

    /// Fee charged to the aggressing side
    pub fn taker_fee(&self, trade_value: Decimal) -> Decimal {
        trade_value * self.taker_rate
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            maker_rate: Decimal::new(1, 3), // 0.1%
            taker_rate: Decimal::new(2, 3), // 0.2%
        }
    }
}
