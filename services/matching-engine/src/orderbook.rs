//! Two-sided order book with id index
//!
//! Holds the bid and ask sides plus an `orders` index over every resting
//! order, supporting cancel by id, BBO and depth views, snapshotting, and
//! journal replay. Crossed books are transient inside matching and never
//! visible through this type's public reads.

use std::collections::HashMap;

use rust_decimal::Decimal;
use types::errors::RejectReason;
use types::events::{BookSnapshot, EngineEvent};
use types::ids::{OrderId, Symbol};
use types::numeric::{Price, Quantity};
use types::order::{Order, OrderType, Side};

use crate::book::{AskBook, BidBook};

/// Best bid and offer
#[derive(Debug, Clone, PartialEq)]
pub struct Bbo {
    pub best_bid: Option<(Price, Quantity)>,
    pub best_ask: Option<(Price, Quantity)>,
}

impl Bbo {
    /// Spread (ask − bid) when both sides are present
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid, self.best_ask) {
            (Some((bid, _)), Some((ask, _))) => Some(ask.as_decimal() - bid.as_decimal()),
            _ => None,
        }
    }
}

/// Aggregated depth per side, best-first
#[derive(Debug, Clone, PartialEq)]
pub struct DepthView {
    pub bids: Vec<(Price, Quantity)>,
    pub asks: Vec<(Price, Quantity)>,
}

/// Order book for a single symbol
#[derive(Debug, Clone)]
pub struct OrderBook {
    symbol: Symbol,
    bids: BidBook,
    asks: AskBook,
    /// All resting orders by id; terminal orders are removed immediately
    orders: HashMap<OrderId, Order>,
}

impl OrderBook {
    /// Create a new empty order book
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            bids: BidBook::new(),
            asks: AskBook::new(),
            orders: HashMap::new(),
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Number of resting orders
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Look up a resting order by id
    pub fn get(&self, order_id: &OrderId) -> Option<&Order> {
        self.orders.get(order_id)
    }

    /// Check whether an order rests in the book
    pub fn contains(&self, order_id: &OrderId) -> bool {
        self.orders.contains_key(order_id)
    }

    /// Register a limit order with remaining quantity as resting
    ///
    /// Rejects duplicate ids. The caller guarantees the order is a
    /// non-terminal limit order with remaining quantity.
    pub fn add_resting(&mut self, order: Order) -> Result<(), RejectReason> {
        if self.orders.contains_key(&order.order_id) {
            return Err(RejectReason::DuplicateOrderId);
        }
        let price = order.price.ok_or(RejectReason::MissingPrice)?;
        let remaining = order.remaining_quantity();
        if remaining.is_zero() || order.status.is_terminal() {
            return Err(RejectReason::InvalidQuantity);
        }

        match order.side {
            Side::Buy => self.bids.insert(price, order.order_id, remaining),
            Side::Sell => self.asks.insert(price, order.order_id, remaining),
        }
        self.orders.insert(order.order_id, order);
        Ok(())
    }

    /// Cancel a resting order by id
    ///
    /// Idempotent: unknown ids (including already-terminal orders, which
    /// leave the book immediately) return None. On success the order is
    /// removed from its level and returned with status Cancelled.
    pub fn cancel(&mut self, order_id: &OrderId) -> Option<Order> {
        let (side, price) = {
            let order = self.orders.get(order_id)?;
            (order.side, order.price?)
        };

        let removed = match side {
            Side::Buy => self.bids.remove(order_id, price),
            Side::Sell => self.asks.remove(order_id, price),
        };
        if !removed {
            return None;
        }

        let mut order = self.orders.remove(order_id)?;
        order.cancel();
        Some(order)
    }

    /// Best price and aggregate quantity on the side opposite the taker
    pub fn best_opposite(&self, taker_side: Side) -> Option<(Price, Quantity)> {
        match taker_side {
            Side::Buy => self.asks.best_ask(),
            Side::Sell => self.bids.best_bid(),
        }
    }

    /// Front (oldest) order at the best opposite level
    pub fn peek_opposite_front(&self, taker_side: Side) -> Option<(Price, OrderId, Quantity)> {
        match taker_side {
            Side::Buy => self.asks.peek_front_at_best(),
            Side::Sell => self.bids.peek_front_at_best(),
        }
    }

    /// Fill the front maker at the best opposite level
    ///
    /// Updates the maker's fill state and returns a post-fill clone of it;
    /// fully filled makers leave both the level and the id index.
    pub fn fill_opposite_front(&mut self, taker_side: Side, quantity: Quantity) -> Option<Order> {
        let (_, maker_id, _) = match taker_side {
            Side::Buy => self.asks.fill_front_at_best(quantity)?,
            Side::Sell => self.bids.fill_front_at_best(quantity)?,
        };

        let maker = self.orders.get_mut(&maker_id)?;
        maker.add_fill(quantity);
        let snapshot = maker.clone();
        if snapshot.is_filled() {
            self.orders.remove(&maker_id);
        }
        Some(snapshot)
    }

    /// Whether the opposite side holds at least `needed` quantity at or
    /// better than `limit`
    ///
    /// Walks levels best-first with early exit; this is the FOK
    /// feasibility check.
    pub fn opposite_can_fill(
        &self,
        taker_side: Side,
        limit: Option<Price>,
        needed: Quantity,
    ) -> bool {
        let needed = needed.as_decimal();
        let mut total = Decimal::ZERO;

        match taker_side {
            Side::Buy => {
                for (price, level) in self.asks.iter_levels_best_first() {
                    if let Some(limit) = limit {
                        if *price > limit {
                            break;
                        }
                    }
                    total += level.total_quantity().as_decimal();
                    if total >= needed {
                        return true;
                    }
                }
            }
            Side::Sell => {
                for (price, level) in self.bids.iter_levels_best_first() {
                    if let Some(limit) = limit {
                        if *price < limit {
                            break;
                        }
                    }
                    total += level.total_quantity().as_decimal();
                    if total >= needed {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Best bid + best ask + spread
    pub fn bbo(&self) -> Bbo {
        Bbo {
            best_bid: self.bids.best_bid(),
            best_ask: self.asks.best_ask(),
        }
    }

    /// Top `levels` price levels per side with aggregated quantities
    pub fn depth(&self, levels: usize) -> DepthView {
        DepthView {
            bids: self.bids.depth_snapshot(levels),
            asks: self.asks.depth_snapshot(levels),
        }
    }

    /// True when the sides overlap, which must never survive matching
    pub fn is_crossed(&self) -> bool {
        match (self.bids.best_bid(), self.asks.best_ask()) {
            (Some((bid, _)), Some((ask, _))) => crate::matching::crossing::books_cross(bid, ask),
            _ => false,
        }
    }

    /// Capture the resting set in deterministic best-first + FIFO order
    pub fn snapshot(&self, sequence: u64, timestamp: i64) -> BookSnapshot {
        let collect = |ids: Vec<OrderId>| -> Vec<Order> {
            ids.iter()
                .filter_map(|id| self.orders.get(id).cloned())
                .collect()
        };

        let bid_ids: Vec<OrderId> = self
            .bids
            .iter_levels_best_first()
            .flat_map(|(_, level)| level.iter().map(|(id, _)| id))
            .collect();
        let ask_ids: Vec<OrderId> = self
            .asks
            .iter_levels_best_first()
            .flat_map(|(_, level)| level.iter().map(|(id, _)| id))
            .collect();

        BookSnapshot {
            symbol: self.symbol.clone(),
            sequence,
            timestamp,
            bids: collect(bid_ids),
            asks: collect(ask_ids),
        }
    }

    /// Rebuild the resting set from a snapshot
    ///
    /// Orders are inserted in recorded order, reproducing FIFO positions
    /// exactly.
    pub fn restore(&mut self, snapshot: &BookSnapshot) {
        self.bids = BidBook::new();
        self.asks = AskBook::new();
        self.orders.clear();

        for order in snapshot.bids.iter().chain(snapshot.asks.iter()) {
            let _ = self.add_resting(order.clone());
        }
    }

    /// Apply one journal event during replay
    pub fn apply_event(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::OrderAdmitted(order) => {
                // Marketable orders never rest; duplicates come from
                // snapshot overlap and are skipped quietly
                if order.order_type == OrderType::Limit
                    && !order.status.is_terminal()
                    && !self.orders.contains_key(&order.order_id)
                {
                    let _ = self.add_resting(order.clone());
                }
            }
            EngineEvent::TradeExecuted(trade) => {
                self.apply_trade_fill(&trade.maker_order_id, trade.quantity);
                self.apply_trade_fill(&trade.taker_order_id, trade.quantity);
            }
            EngineEvent::OrderCancelled { order_id, .. } => {
                let _ = self.cancel(order_id);
            }
            EngineEvent::OrderStatusChanged { .. } => {}
        }
    }

    /// Reduce a resting order by a replayed trade quantity
    fn apply_trade_fill(&mut self, order_id: &OrderId, quantity: Quantity) {
        let (side, price) = match self.orders.get_mut(order_id) {
            Some(order) => {
                order.add_fill(quantity);
                let price = match order.price {
                    Some(price) => price,
                    None => return,
                };
                (order.side, price)
            }
            None => return,
        };

        match side {
            Side::Buy => self.bids.reduce(order_id, price, quantity),
            Side::Sell => self.asks.reduce(order_id, price, quantity),
        };

        if self
            .orders
            .get(order_id)
            .map(|o| o.is_filled())
            .unwrap_or(false)
        {
            self.orders.remove(order_id);
        }
    }
}
