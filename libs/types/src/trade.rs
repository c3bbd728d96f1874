//! Trade types
//!
//! A trade is the immutable record of one (taker, maker) intersection
//! produced by the matching walk.

use crate::ids::{OrderId, Symbol, TradeId};
use crate::numeric::{Price, Quantity};
use crate::order::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An executed trade between a resting maker and an incoming taker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub trade_id: TradeId,
    /// Per-symbol monotonic event sequence
    pub sequence: u64,
    pub symbol: Symbol,

    /// Execution price: always the maker's posted price
    pub price: Price,
    pub quantity: Quantity,
    /// Side of the incoming (taker) order
    pub aggressor_side: Side,

    pub maker_order_id: OrderId,
    pub taker_order_id: OrderId,

    // String-encoded so both JSON and the binary journal stay exact
    #[serde(with = "rust_decimal::serde::str")]
    pub maker_fee: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub taker_fee: Decimal,

    /// Unix nanos
    pub executed_at: i64,
}

impl Trade {
    /// Create a new trade
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sequence: u64,
        symbol: Symbol,
        price: Price,
        quantity: Quantity,
        aggressor_side: Side,
        maker_order_id: OrderId,
        taker_order_id: OrderId,
        maker_fee: Decimal,
        taker_fee: Decimal,
        executed_at: i64,
    ) -> Self {
        Self {
            trade_id: TradeId::new(),
            sequence,
            symbol,
            price,
            quantity,
            aggressor_side,
            maker_order_id,
            taker_order_id,
            maker_fee,
            taker_fee,
            executed_at,
        }
    }

    /// Notional value (price × quantity)
    pub fn trade_value(&self) -> Decimal {
        self.quantity.as_decimal() * self.price.as_decimal()
    }
}
