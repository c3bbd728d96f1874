//! Trade construction
//!
//! Builds trades from (taker, maker) intersections and applies the fee
//! schedule. The execution price is always the maker's posted price.

use types::fee::FeeSchedule;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};
use types::order::Order;
use types::trade::Trade;

/// Builds trades with fees for the matching walk
#[derive(Debug, Clone)]
pub struct TradeExecutor {
    fees: FeeSchedule,
}

impl TradeExecutor {
    pub fn new(fees: FeeSchedule) -> Self {
        Self { fees }
    }

    /// Create a trade at the maker's price
    pub fn execute(
        &self,
        sequence: u64,
        maker_order_id: OrderId,
        taker: &Order,
        price: Price,
        quantity: Quantity,
        executed_at: i64,
    ) -> Trade {
        let trade_value = quantity * price;

        Trade::new(
            sequence,
            taker.symbol.clone(),
            price,
            quantity,
            taker.side,
            maker_order_id,
            taker.order_id,
            self.fees.maker_fee(trade_value),
            self.fees.taker_fee(trade_value),
            executed_at,
        )
    }
}
