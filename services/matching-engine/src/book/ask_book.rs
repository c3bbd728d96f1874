//! Ask (sell-side) order book
//!
//! Maintains sell orders sorted by price ascending (best ask first).
//! Mirror of the bid book with the opposite price ordering.

use std::collections::BTreeMap;
use types::ids::OrderId;
use types::numeric::{Price, Quantity};

use super::price_level::PriceLevel;

/// Ask (sell) side order book
///
/// The lowest price is the best ask. At each price level, orders are
/// maintained in FIFO order.
#[derive(Debug, Clone, Default)]
pub struct AskBook {
    levels: BTreeMap<Price, PriceLevel>,
}

impl AskBook {
    /// Create a new empty ask book
    pub fn new() -> Self {
        Self {
            levels: BTreeMap::new(),
        }
    }

    /// Insert an order at its price level, creating the level if new
    pub fn insert(&mut self, price: Price, order_id: OrderId, quantity: Quantity) {
        let level = self.levels.entry(price).or_default();
        level.insert(order_id, quantity);
    }

    /// Remove an order from the ask book
    ///
    /// Returns true if the order was found and removed
    pub fn remove(&mut self, order_id: &OrderId, price: Price) -> bool {
        if let Some(level) = self.levels.get_mut(&price) {
            if level.remove(order_id).is_some() {
                if level.is_empty() {
                    self.levels.remove(&price);
                }
                return true;
            }
        }
        false
    }

    /// Reduce a resting order's remaining quantity, removing it at zero
    pub fn reduce(&mut self, order_id: &OrderId, price: Price, delta: Quantity) -> bool {
        if let Some(level) = self.levels.get_mut(&price) {
            if level.reduce(order_id, delta).is_some() {
                if level.is_empty() {
                    self.levels.remove(&price);
                }
                return true;
            }
        }
        false
    }

    /// Get the best ask (lowest price) with its aggregate quantity
    pub fn best_ask(&self) -> Option<(Price, Quantity)> {
        self.levels
            .iter()
            .next()
            .map(|(price, level)| (*price, level.total_quantity()))
    }

    /// Peek the front (oldest) order at the best ask level
    pub fn peek_front_at_best(&self) -> Option<(Price, OrderId, Quantity)> {
        let (price, level) = self.levels.iter().next()?;
        let (order_id, remaining) = level.peek_front()?;
        Some((*price, order_id, remaining))
    }

    /// Fill the front order at the best ask level by `quantity`
    ///
    /// Returns (price, order_id, remaining after). Destroys the level if
    /// it becomes empty.
    pub fn fill_front_at_best(&mut self, quantity: Quantity) -> Option<(Price, OrderId, Quantity)> {
        let (&price, level) = self.levels.iter_mut().next()?;
        let (order_id, remaining_after) = level.fill_front(quantity)?;
        if level.is_empty() {
            self.levels.remove(&price);
        }
        Some((price, order_id, remaining_after))
    }

    /// Iterate price levels best-first (lowest price first)
    pub fn iter_levels_best_first(&self) -> impl Iterator<Item = (&Price, &PriceLevel)> {
        self.levels.iter()
    }

    /// Get depth snapshot (top N price levels, best first)
    pub fn depth_snapshot(&self, depth: usize) -> Vec<(Price, Quantity)> {
        self.levels
            .iter()
            .take(depth)
            .map(|(price, level)| (*price, level.total_quantity()))
            .collect()
    }

    /// Check if the ask book is empty
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Get the total number of price levels
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(s: &str) -> Quantity {
        Quantity::from_str(s).unwrap()
    }

    #[test]
    fn test_best_ask_is_lowest_price() {
        let mut book = AskBook::new();
        book.insert(Price::from_u64(50000), OrderId::new(), qty("1.0"));
        book.insert(Price::from_u64(51000), OrderId::new(), qty("2.0"));
        book.insert(Price::from_u64(49000), OrderId::new(), qty("1.5"));

        let (best_price, best_qty) = book.best_ask().unwrap();
        assert_eq!(best_price, Price::from_u64(49000));
        assert_eq!(best_qty, qty("1.5"));
    }

    #[test]
    fn test_remove_destroys_empty_level() {
        let mut book = AskBook::new();
        let order_id = OrderId::new();
        book.insert(Price::from_u64(50000), order_id, qty("1.0"));

        assert!(book.remove(&order_id, Price::from_u64(50000)));
        assert!(book.is_empty());
    }

    #[test]
    fn test_depth_snapshot_best_first() {
        let mut book = AskBook::new();
        book.insert(Price::from_u64(50000), OrderId::new(), qty("1.0"));
        book.insert(Price::from_u64(51000), OrderId::new(), qty("2.0"));
        book.insert(Price::from_u64(49000), OrderId::new(), qty("1.5"));

        let depth = book.depth_snapshot(2);
        assert_eq!(depth.len(), 2);
        assert_eq!(depth[0].0, Price::from_u64(49000));
        assert_eq!(depth[1].0, Price::from_u64(50000));
    }

    #[test]
    fn test_reduce_removes_at_zero() {
        let mut book = AskBook::new();
        let order_id = OrderId::new();
        book.insert(Price::from_u64(100), order_id, qty("2.0"));

        assert!(book.reduce(&order_id, Price::from_u64(100), qty("2.0")));
        assert!(book.is_empty());
    }
}
