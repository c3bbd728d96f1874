//! Price level implementation with FIFO queue
//!
//! A price level contains all resting orders at a specific price point.
//! Orders are maintained in FIFO order to enforce time priority: matching
//! always consumes the front, new orders always append at the back.

use std::collections::VecDeque;
use types::ids::OrderId;
use types::numeric::Quantity;

/// A price level containing orders at a specific price
///
/// Maintains strict FIFO ordering. Entries hold the order id and its
/// remaining quantity; the full order lives in the book's id index.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// Queue of orders at this price level (FIFO order)
    orders: VecDeque<LevelEntry>,
    /// Total remaining quantity at this level
    total_quantity: Quantity,
}

#[derive(Debug, Clone)]
struct LevelEntry {
    order_id: OrderId,
    remaining_quantity: Quantity,
}

impl PriceLevel {
    /// Create a new empty price level
    pub fn new() -> Self {
        Self {
            orders: VecDeque::new(),
            total_quantity: Quantity::zero(),
        }
    }

    /// Insert an order at the back of the queue (time priority)
    pub fn insert(&mut self, order_id: OrderId, quantity: Quantity) {
        self.orders.push_back(LevelEntry {
            order_id,
            remaining_quantity: quantity,
        });
        self.total_quantity = self.total_quantity + quantity;
    }

    /// Remove an order from the queue by id
    ///
    /// Returns the remaining quantity of the removed order, or None if not found
    pub fn remove(&mut self, order_id: &OrderId) -> Option<Quantity> {
        let position = self
            .orders
            .iter()
            .position(|entry| &entry.order_id == order_id)?;
        let entry = self.orders.remove(position)?;

        self.total_quantity = self.total_quantity.saturating_sub(entry.remaining_quantity);
        Some(entry.remaining_quantity)
    }

    /// Peek at the front order without removing it
    pub fn peek_front(&self) -> Option<(OrderId, Quantity)> {
        self.orders
            .front()
            .map(|entry| (entry.order_id, entry.remaining_quantity))
    }

    /// Fill the front order by `quantity`
    ///
    /// Returns (order_id, remaining after the fill). The entry is removed
    /// when its remaining quantity reaches zero.
    ///
    /// # Panics
    /// Panics if the fill exceeds the front order's remaining quantity
    pub fn fill_front(&mut self, quantity: Quantity) -> Option<(OrderId, Quantity)> {
        let entry = self.orders.front_mut()?;
        assert!(
            quantity.as_decimal() <= entry.remaining_quantity.as_decimal(),
            "Fill exceeds front order remaining quantity"
        );

        entry.remaining_quantity = entry.remaining_quantity - quantity;
        let order_id = entry.order_id;
        let remaining_after = entry.remaining_quantity;

        if remaining_after.is_zero() {
            self.orders.pop_front();
        }
        self.total_quantity = self.total_quantity.saturating_sub(quantity);

        Some((order_id, remaining_after))
    }

    /// Reduce a specific order's remaining quantity by `delta`
    ///
    /// Used during journal replay, where the reduced order is not
    /// necessarily at the front of its level. The entry is removed when it
    /// reaches zero. Returns the remaining quantity after the reduction.
    pub fn reduce(&mut self, order_id: &OrderId, delta: Quantity) -> Option<Quantity> {
        let position = self
            .orders
            .iter()
            .position(|entry| &entry.order_id == order_id)?;

        let entry = &mut self.orders[position];
        entry.remaining_quantity = entry.remaining_quantity.saturating_sub(delta);
        let remaining_after = entry.remaining_quantity;

        if remaining_after.is_zero() {
            self.orders.remove(position);
        }
        self.total_quantity = self.total_quantity.saturating_sub(delta);

        Some(remaining_after)
    }

    /// Iterate entries in FIFO order as (order_id, remaining)
    pub fn iter(&self) -> impl Iterator<Item = (OrderId, Quantity)> + '_ {
        self.orders
            .iter()
            .map(|entry| (entry.order_id, entry.remaining_quantity))
    }

    /// Check if the price level is empty
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Get the total remaining quantity at this price level
    pub fn total_quantity(&self) -> Quantity {
        self.total_quantity
    }

    /// Get the number of orders at this level
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qty(s: &str) -> Quantity {
        Quantity::from_str(s).unwrap()
    }

    #[test]
    fn test_insert_and_totals() {
        let mut level = PriceLevel::new();
        level.insert(OrderId::new(), qty("1.5"));
        level.insert(OrderId::new(), qty("2.5"));
        level.insert(OrderId::new(), qty("3.0"));

        assert_eq!(level.order_count(), 3);
        assert_eq!(level.total_quantity(), qty("7.0"));
    }

    #[test]
    fn test_fifo_order() {
        let mut level = PriceLevel::new();
        let first = OrderId::new();
        let second = OrderId::new();

        level.insert(first, qty("1.0"));
        level.insert(second, qty("2.0"));

        let (front_id, front_qty) = level.peek_front().unwrap();
        assert_eq!(front_id, first);
        assert_eq!(front_qty, qty("1.0"));
    }

    #[test]
    fn test_remove_updates_total() {
        let mut level = PriceLevel::new();
        let first = OrderId::new();
        let second = OrderId::new();

        level.insert(first, qty("1.0"));
        level.insert(second, qty("2.0"));

        assert_eq!(level.remove(&first), Some(qty("1.0")));
        assert_eq!(level.order_count(), 1);
        assert_eq!(level.total_quantity(), qty("2.0"));
        assert_eq!(level.remove(&first), None);
    }

    #[test]
    fn test_fill_front_partial() {
        let mut level = PriceLevel::new();
        let order_id = OrderId::new();
        level.insert(order_id, qty("5.0"));

        let (id, remaining) = level.fill_front(qty("2.0")).unwrap();
        assert_eq!(id, order_id);
        assert_eq!(remaining, qty("3.0"));
        assert_eq!(level.total_quantity(), qty("3.0"));
        assert_eq!(level.order_count(), 1);
    }

    #[test]
    fn test_fill_front_exhausts_entry() {
        let mut level = PriceLevel::new();
        let first = OrderId::new();
        let second = OrderId::new();
        level.insert(first, qty("1.0"));
        level.insert(second, qty("2.0"));

        let (id, remaining) = level.fill_front(qty("1.0")).unwrap();
        assert_eq!(id, first);
        assert!(remaining.is_zero());

        // Second order is now at the front
        let (front_id, _) = level.peek_front().unwrap();
        assert_eq!(front_id, second);
        assert_eq!(level.total_quantity(), qty("2.0"));
    }

    #[test]
    #[should_panic(expected = "Fill exceeds front order remaining quantity")]
    fn test_fill_front_overfill_panics() {
        let mut level = PriceLevel::new();
        level.insert(OrderId::new(), qty("1.0"));
        level.fill_front(qty("2.0"));
    }

    #[test]
    fn test_reduce_by_id() {
        let mut level = PriceLevel::new();
        let first = OrderId::new();
        let second = OrderId::new();
        level.insert(first, qty("1.0"));
        level.insert(second, qty("2.0"));

        // Reduce the back entry, front untouched
        assert_eq!(level.reduce(&second, qty("0.5")), Some(qty("1.5")));
        assert_eq!(level.total_quantity(), qty("2.5"));

        // Reduce to zero removes the entry
        assert_eq!(level.reduce(&second, qty("1.5")), Some(Quantity::zero()));
        assert_eq!(level.order_count(), 1);
    }

    #[test]
    fn test_total_matches_entry_sum() {
        let mut level = PriceLevel::new();
        let ids: Vec<OrderId> = (0..4).map(|_| OrderId::new()).collect();
        for id in &ids {
            level.insert(*id, qty("1.5"));
        }
        level.remove(&ids[2]);
        level.fill_front(qty("0.5"));

        let entry_sum: rust_decimal::Decimal =
            level.iter().map(|(_, q)| q.as_decimal()).sum();
        assert_eq!(level.total_quantity().as_decimal(), entry_sum);
    }
}
