//! Order lifecycle types

use crate::ids::{OrderId, Symbol};
use crate::numeric::{Price, Quantity};
use serde::{Deserialize, Serialize};

/// Order side (buyer or seller)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy order (bid)
    Buy,
    /// Sell order (ask)
    Sell,
}

impl Side {
    /// Get the opposite side
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Order execution type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Execute immediately at any available price, never rests
    Market,
    /// Execute at the limit price or better, residual rests on the book
    Limit,
    /// Immediate-or-cancel: fill what is available now, cancel the rest
    Ioc,
    /// Fill-or-kill: fill the entire quantity atomically or cancel
    Fok,
}

impl OrderType {
    /// True if the order must execute immediately and never rests
    pub fn is_marketable(&self) -> bool {
        !matches!(self, OrderType::Limit)
    }

    /// Parse a wire string; unrecognized values are a rejection, not a panic
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "market" => Some(OrderType::Market),
            "limit" => Some(OrderType::Limit),
            "ioc" => Some(OrderType::Ioc),
            "fok" => Some(OrderType::Fok),
            _ => None,
        }
    }
}

/// Order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Admitted and resting (or awaiting matching)
    Pending,
    /// Some quantity executed
    PartiallyFilled,
    /// Completely executed (terminal)
    Filled,
    /// Cancelled by user or by residual policy (terminal)
    Cancelled,
    /// Failed validation (terminal)
    Rejected,
}

impl OrderStatus {
    /// Check if status is terminal (no further transitions possible)
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

/// Transport-neutral order admission request
///
/// The gateway parses wire messages into this shape; the engine assigns
/// identity and sequence on admission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    pub price: Option<Price>,
    pub quantity: Quantity,
    pub user_id: Option<String>,
    pub client_order_id: Option<String>,
}

/// A trading order with immutable identity and mutable fill state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: OrderId,
    pub symbol: Symbol,
    pub side: Side,
    pub order_type: OrderType,
    /// Required for limit, optional for IOC, absent for market
    pub price: Option<Price>,
    pub quantity: Quantity,
    pub filled_quantity: Quantity,
    pub status: OrderStatus,
    /// Admission sequence number; establishes time priority within a symbol
    pub sequence: u64,
    /// Unix nanos at admission
    pub accepted_at: i64,
    pub user_id: Option<String>,
    pub client_order_id: Option<String>,
}

impl Order {
    /// Create a new pending order at admission
    pub fn new(
        symbol: Symbol,
        side: Side,
        order_type: OrderType,
        price: Option<Price>,
        quantity: Quantity,
        sequence: u64,
        accepted_at: i64,
    ) -> Self {
        Self {
            order_id: OrderId::new(),
            symbol,
            side,
            order_type,
            price,
            quantity,
            filled_quantity: Quantity::zero(),
            status: OrderStatus::Pending,
            sequence,
            accepted_at,
            user_id: None,
            client_order_id: None,
        }
    }

    /// Build an order from an admission request
    pub fn from_request(request: OrderRequest, sequence: u64, accepted_at: i64) -> Self {
        let mut order = Self::new(
            request.symbol,
            request.side,
            request.order_type,
            request.price,
            request.quantity,
            sequence,
            accepted_at,
        );
        order.user_id = request.user_id;
        order.client_order_id = request.client_order_id;
        order
    }

    /// Unfilled quantity: quantity - filled_quantity
    pub fn remaining_quantity(&self) -> Quantity {
        self.quantity.saturating_sub(self.filled_quantity)
    }

    /// Check quantity invariant: filled ≤ total
    pub fn check_invariant(&self) -> bool {
        self.filled_quantity.as_decimal() <= self.quantity.as_decimal()
    }

    /// Check if order is completely filled
    pub fn is_filled(&self) -> bool {
        self.filled_quantity == self.quantity
    }

    /// Check if order has any fills
    pub fn has_fills(&self) -> bool {
        !self.filled_quantity.is_zero()
    }

    /// Record a fill and adjust status
    ///
    /// # Panics
    /// Panics if the fill would exceed total quantity
    pub fn add_fill(&mut self, fill_quantity: Quantity) {
        let new_filled = self.filled_quantity + fill_quantity;

        assert!(
            new_filled.as_decimal() <= self.quantity.as_decimal(),
            "Fill would exceed order quantity"
        );

        self.filled_quantity = new_filled;

        if self.is_filled() {
            self.status = OrderStatus::Filled;
        } else if self.has_fills() {
            self.status = OrderStatus::PartiallyFilled;
        }
    }

    /// Mark the order cancelled
    ///
    /// # Panics
    /// Panics if order is already in terminal state
    pub fn cancel(&mut self) {
        assert!(!self.status.is_terminal(), "Cannot cancel terminal order");
        self.status = OrderStatus::Cancelled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_order(qty: &str) -> Order {
        Order::new(
            Symbol::new("BTC-USDT"),
            Side::Buy,
            OrderType::Limit,
            Some(Price::from_u64(50000)),
            Quantity::from_str(qty).unwrap(),
            1,
            1_708_123_456_789_000_000,
        )
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Buy.opposite(), Side::Sell);
        assert_eq!(Side::Sell.opposite(), Side::Buy);
    }

    #[test]
    fn test_order_type_parse() {
        assert_eq!(OrderType::parse("market"), Some(OrderType::Market));
        assert_eq!(OrderType::parse("limit"), Some(OrderType::Limit));
        assert_eq!(OrderType::parse("ioc"), Some(OrderType::Ioc));
        assert_eq!(OrderType::parse("fok"), Some(OrderType::Fok));
        assert_eq!(OrderType::parse("stop_limit"), None);
    }

    #[test]
    fn test_marketable_types() {
        assert!(OrderType::Market.is_marketable());
        assert!(OrderType::Ioc.is_marketable());
        assert!(OrderType::Fok.is_marketable());
        assert!(!OrderType::Limit.is_marketable());
    }

    #[test]
    fn test_order_creation() {
        let order = sample_order("1.0");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.remaining_quantity(), Quantity::from_str("1.0").unwrap());
        assert!(!order.has_fills());
    }

    #[test]
    fn test_order_fill_transitions() {
        let mut order = sample_order("1.0");

        order.add_fill(Quantity::from_str("0.3").unwrap());
        assert_eq!(order.status, OrderStatus::PartiallyFilled);
        assert_eq!(order.remaining_quantity(), Quantity::from_str("0.7").unwrap());

        order.add_fill(Quantity::from_str("0.7").unwrap());
        assert_eq!(order.status, OrderStatus::Filled);
        assert!(order.remaining_quantity().is_zero());
        assert!(order.status.is_terminal());
    }

    #[test]
    #[should_panic(expected = "Fill would exceed order quantity")]
    fn test_order_overfill_panics() {
        let mut order = sample_order("1.0");
        order.add_fill(Quantity::from_str("1.5").unwrap());
    }

    #[test]
    fn test_order_cancel() {
        let mut order = sample_order("1.0");
        order.cancel();
        assert_eq!(order.status, OrderStatus::Cancelled);
        assert!(order.status.is_terminal());
    }

    #[test]
    #[should_panic(expected = "Cannot cancel terminal order")]
    fn test_cancel_terminal_panics() {
        let mut order = sample_order("1.0");
        order.add_fill(Quantity::from_str("1.0").unwrap());
        order.cancel();
    }

    #[test]
    fn test_wire_serialization() {
        let order = sample_order("2.5");
        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("\"side\":\"buy\""));
        assert!(json.contains("\"order_type\":\"limit\""));
        assert!(json.contains("\"status\":\"pending\""));

        let deserialized: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, deserialized);
    }
}
