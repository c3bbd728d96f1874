//! Matching algorithms
//!
//! All four order types share the same walk: consume the opposite side
//! best-price-first, FIFO within each level, one trade per (taker, maker)
//! intersection, always at the maker's price. The types differ only in
//! the price bound and in what happens to residual quantity.
//!
//! Everything here runs inside the symbol's critical section.

pub mod crossing;
pub mod executor;

use tracing::error;
use types::events::EngineEvent;
use types::numeric::Price;
use types::order::{Order, OrderStatus, OrderType};
use types::trade::Trade;

use crate::orderbook::OrderBook;
use self::executor::TradeExecutor;

/// Mutable state threaded through one matching pass
pub struct MatchContext<'a> {
    pub book: &'a mut OrderBook,
    pub executor: &'a TradeExecutor,
    pub next_sequence: &'a mut u64,
    pub now: i64,
}

impl MatchContext<'_> {
    fn next_seq(&mut self) -> u64 {
        let sequence = *self.next_sequence;
        *self.next_sequence += 1;
        sequence
    }
}

/// Outcome of matching one incoming order
#[derive(Debug, Default)]
pub struct MatchResult {
    pub trades: Vec<Trade>,
    /// Journal events in emission order: trades interleaved with maker
    /// terminal transitions
    pub events: Vec<EngineEvent>,
}

/// Match an incoming order against the book per its type
pub fn match_order(ctx: &mut MatchContext, taker: &mut Order) -> MatchResult {
    match taker.order_type {
        OrderType::Limit => match_limit(ctx, taker),
        OrderType::Market => match_market(ctx, taker),
        OrderType::Ioc => match_ioc(ctx, taker),
        OrderType::Fok => match_fok(ctx, taker),
    }
}

/// Walk the opposite side, bounded by `limit` when present
///
/// Fully consumed makers are removed before the next iteration so they
/// can never match twice; partially consumed makers keep their FIFO slot.
fn walk(ctx: &mut MatchContext, taker: &mut Order, limit: Option<Price>, out: &mut MatchResult) {
    while !taker.remaining_quantity().is_zero() {
        let Some((best_price, _)) = ctx.book.best_opposite(taker.side) else {
            break;
        };
        if let Some(limit) = limit {
            if !crossing::taker_crosses(taker.side, limit, best_price) {
                break;
            }
        }
        let Some((_, _, maker_remaining)) = ctx.book.peek_opposite_front(taker.side) else {
            break;
        };

        let fill = taker.remaining_quantity().min(maker_remaining);
        let Some(maker) = ctx.book.fill_opposite_front(taker.side, fill) else {
            break;
        };

        let sequence = ctx.next_seq();
        let trade = ctx
            .executor
            .execute(sequence, maker.order_id, taker, best_price, fill, ctx.now);
        taker.add_fill(fill);

        out.events.push(EngineEvent::TradeExecuted(trade.clone()));
        if maker.status == OrderStatus::Filled {
            out.events.push(EngineEvent::OrderStatusChanged {
                sequence: ctx.next_seq(),
                order_id: maker.order_id,
                status: maker.status,
                filled_quantity: maker.filled_quantity,
                timestamp: ctx.now,
            });
        }
        out.trades.push(trade);
    }
}

/// Limit: price-bounded walk, residual rests on the book
fn match_limit(ctx: &mut MatchContext, taker: &mut Order) -> MatchResult {
    let mut out = MatchResult::default();
    walk(ctx, taker, taker.price, &mut out);

    if !taker.remaining_quantity().is_zero() {
        if let Err(reason) = ctx.book.add_resting(taker.clone()) {
            error!(order_id = %taker.order_id, %reason, "failed to rest limit residual");
        }
    }
    out
}

/// Market: unbounded walk, residual cancelled, never rests
fn match_market(ctx: &mut MatchContext, taker: &mut Order) -> MatchResult {
    let mut out = MatchResult::default();
    walk(ctx, taker, None, &mut out);

    if !taker.remaining_quantity().is_zero() && !taker.has_fills() {
        taker.status = OrderStatus::Cancelled;
    }
    // Partial fills keep PartiallyFilled; the residual is cancelled by
    // never resting
    out
}

/// IOC: limit-bounded walk when a price is given, market walk otherwise;
/// residual cancelled, never rests
fn match_ioc(ctx: &mut MatchContext, taker: &mut Order) -> MatchResult {
    let mut out = MatchResult::default();
    walk(ctx, taker, taker.price, &mut out);

    if !taker.remaining_quantity().is_zero() && !taker.has_fills() {
        taker.status = OrderStatus::Cancelled;
    }
    out
}

/// FOK: feasibility check, then full execution, both under one lock
///
/// Either zero trades are produced or the full quantity fills; no
/// intermediate state is ever observable.
fn match_fok(ctx: &mut MatchContext, taker: &mut Order) -> MatchResult {
    let mut out = MatchResult::default();

    if !ctx
        .book
        .opposite_can_fill(taker.side, taker.price, taker.quantity)
    {
        taker.status = OrderStatus::Cancelled;
        return out;
    }

    walk(ctx, taker, taker.price, &mut out);
    debug_assert!(
        taker.remaining_quantity().is_zero(),
        "feasible FOK must fill completely under the lock"
    );
    out
}
