//! Price compatibility predicates
//!
//! Two questions come up during matching: may a bounded taker consume a
//! given resting level, and do the two sides of a resting book overlap.
//! Both are pure price comparisons kept here so the walk reads as
//! intent.

use types::numeric::Price;
use types::order::Side;

/// Whether a taker bounded by `limit` may consume a resting level
///
/// A buyer pays at most its limit, so it reaches levels priced at or
/// below it; a seller accepts at least its limit, so it reaches levels
/// priced at or above it.
pub fn taker_crosses(taker_side: Side, limit: Price, resting_price: Price) -> bool {
    match taker_side {
        Side::Buy => limit >= resting_price,
        Side::Sell => limit <= resting_price,
    }
}

/// Whether a resting book overlaps itself
///
/// True when the best bid has reached the best ask. Matching consumes
/// any overlap before releasing the lock, so outside the critical
/// section this must never hold.
pub fn books_cross(best_bid: Price, best_ask: Price) -> bool {
    best_bid >= best_ask
}
