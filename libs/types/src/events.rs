//! Journal event taxonomy and snapshot payloads
//!
//! Every durable record flows through [`EngineEvent`]: order admissions,
//! trades, cancellations, and terminal status transitions. The journal is
//! totally ordered within a symbol by the event sequence, and replaying
//! events against a book snapshot reconstructs the resting set exactly.

use crate::ids::{OrderId, Symbol};
use crate::numeric::Quantity;
use crate::order::{Order, OrderStatus};
use crate::trade::Trade;
use serde::{Deserialize, Serialize};

/// A single durable engine event
///
/// Replay semantics:
/// - `OrderAdmitted` carries the order state at admission (no fills).
///   Limit orders are inserted into the book; marketable orders are not.
/// - `TradeExecuted` reduces both referenced orders' resting entries.
/// - `OrderCancelled` removes the order from the book if present.
/// - `OrderStatusChanged` records terminal transitions for the durable
///   order history; it has no book effect on replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EngineEvent {
    OrderAdmitted(Order),
    TradeExecuted(Trade),
    OrderCancelled {
        sequence: u64,
        order_id: OrderId,
        timestamp: i64,
    },
    OrderStatusChanged {
        sequence: u64,
        order_id: OrderId,
        status: OrderStatus,
        filled_quantity: Quantity,
        timestamp: i64,
    },
}

impl EngineEvent {
    /// Per-symbol monotonic sequence of this event
    pub fn sequence(&self) -> u64 {
        match self {
            EngineEvent::OrderAdmitted(order) => order.sequence,
            EngineEvent::TradeExecuted(trade) => trade.sequence,
            EngineEvent::OrderCancelled { sequence, .. } => *sequence,
            EngineEvent::OrderStatusChanged { sequence, .. } => *sequence,
        }
    }

    /// Unix nanos at which the event occurred
    pub fn timestamp(&self) -> i64 {
        match self {
            EngineEvent::OrderAdmitted(order) => order.accepted_at,
            EngineEvent::TradeExecuted(trade) => trade.executed_at,
            EngineEvent::OrderCancelled { timestamp, .. } => *timestamp,
            EngineEvent::OrderStatusChanged { timestamp, .. } => *timestamp,
        }
    }

    /// Event type tag for journal entries
    pub fn event_type(&self) -> &'static str {
        match self {
            EngineEvent::OrderAdmitted(_) => "order_admitted",
            EngineEvent::TradeExecuted(_) => "trade_executed",
            EngineEvent::OrderCancelled { .. } => "order_cancelled",
            EngineEvent::OrderStatusChanged { .. } => "order_status_changed",
        }
    }
}

/// Point-in-time dump of the resting order set for one symbol
///
/// Orders are listed deterministically: bids best-price-first and asks
/// best-price-first, FIFO within each price level. Restoring by inserting
/// in recorded order reproduces the exact time priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSnapshot {
    pub symbol: Symbol,
    /// Last event sequence covered by this snapshot
    pub sequence: u64,
    /// Unix nanos when the snapshot was taken
    pub timestamp: i64,
    pub bids: Vec<Order>,
    pub asks: Vec<Order>,
}

impl BookSnapshot {
    /// Total number of resting orders captured
    pub fn order_count(&self) -> usize {
        self.bids.len() + self.asks.len()
    }
}
